// Domain layer: request model and the search port. Adapters implement the port.

pub mod model;
pub mod ports;
