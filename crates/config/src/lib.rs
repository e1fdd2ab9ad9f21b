mod settings;

pub use settings::{
    AppSettings, DatabaseSettings, JwtSettings, MediaSettings, Settings, TranscriptionSettings,
};
