// Domain layer: entities, request types and the ports the services depend on.

pub mod model;
pub mod ports;
