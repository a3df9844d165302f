// Fieldwork Corpus - metadata store for linguistic fieldwork recordings
//
// Provides:
// - SQLite persistence for languages, dialects, lexicon, recordings and corpora
// - Overwrite-on-collision media storage for transcription and audio files
// - Participant lookup in ELAN transcriptions and audio header probing

pub mod config;
pub mod database;
pub mod storage;
pub mod string_id;
pub mod transcription;
pub mod audio_probe;
pub mod store;
mod validation;

pub use config::StoreConfig;
pub use database::DatabaseManager;
pub use storage::{FileRef, OverwriteStorage};
pub use string_id::StringId;
pub use transcription::{ElanReader, TranscriptionReader};
pub use audio_probe::{AudioHeader, AudioHeaderProbe, AudioProbe, HeaderSniffer};
pub use store::CorpusStore;

/// Initialize env_logger on stderr (reads RUST_LOG, defaults to "info").
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
