mod connection_state;
mod controller_link;

pub use connection_state::ConnectionState;
pub use controller_link::ControllerLink;
