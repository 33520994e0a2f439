pub mod mqtt;
pub mod timescale;

pub use mqtt::MqttAdapter;
pub use timescale::TimescaleSink;
