pub mod audio_cpal;
pub mod config_store;
pub mod gateway_http;

pub use audio_cpal::CpalAudioInput;
pub use config_store::TomlConfigStore;
pub use gateway_http::HttpIntentGateway;
