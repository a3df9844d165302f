// Corpus store
//
// Ties the database to the media storage: file renames and attachments touch
// both, and the participant and audio lookups read stored files on behalf of
// a recording.

use anyhow::{bail, Result};
use std::io::ErrorKind;

use crate::audio_probe::{AudioHeaderProbe, AudioProbe, HeaderSniffer};
use crate::config::StoreConfig;
use crate::database::{DatabaseManager, Recording, RecordingFileKind};
use crate::storage::{sanitize_file_name, FileRef, OverwriteStorage};
use crate::transcription::{ElanReader, TranscriptionReader};

pub struct CorpusStore {
    db: DatabaseManager,
    storage: OverwriteStorage,
    reader: Box<dyn TranscriptionReader + Send + Sync>,
    probe: Box<dyn AudioHeaderProbe + Send + Sync>,
}

impl CorpusStore {
    /// Open (or create) the database and media root described by `config`
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let db = DatabaseManager::new(config.database_path.clone())?;
        let storage = OverwriteStorage::new(config.media_root.clone());
        log::info!("Media root: {}", storage.root().display());
        Ok(Self::new(db, storage))
    }

    /// Store with the ELAN reader and the default header probe
    pub fn new(db: DatabaseManager, storage: OverwriteStorage) -> Self {
        Self::with_readers(db, storage, Box::new(ElanReader::new()), Box::new(HeaderSniffer::new()))
    }

    pub fn with_readers(
        db: DatabaseManager,
        storage: OverwriteStorage,
        reader: Box<dyn TranscriptionReader + Send + Sync>,
        probe: Box<dyn AudioHeaderProbe + Send + Sync>,
    ) -> Self {
        Self { db, storage, reader, probe }
    }

    pub fn db(&self) -> &DatabaseManager {
        &self.db
    }

    pub fn storage(&self) -> &OverwriteStorage {
        &self.storage
    }

    fn require_recording(&self, recording_id: &str) -> Result<Recording> {
        match self.db.get_recording(recording_id)? {
            Some(recording) => Ok(recording),
            None => bail!("Recording not found: {}", recording_id),
        }
    }

    // ===== Renames =====

    /// Rename the transcription file to `new_base` plus its current extension
    pub fn rename_transcription_file(&self, recording_id: &str, new_base: &str) -> Result<FileRef> {
        self.rename_file(recording_id, RecordingFileKind::Transcription, new_base)
    }

    /// Rename the audio file to `new_base` plus its current extension
    pub fn rename_audio_file(&self, recording_id: &str, new_base: &str) -> Result<FileRef> {
        self.rename_file(recording_id, RecordingFileKind::Audio, new_base)
    }

    fn rename_file(
        &self,
        recording_id: &str,
        kind: RecordingFileKind,
        new_base: &str,
    ) -> Result<FileRef> {
        let recording = self.require_recording(recording_id)?;
        let old = match kind.file_of(&recording) {
            Some(file) => file.clone(),
            None => bail!("Recording {} has no {:?} file", recording.string_id, kind),
        };

        let new = old.with_base_name(new_base)?;
        if new == old {
            return Ok(old);
        }

        self.storage.rename(old.name(), new.name())?;

        // The file has already moved; a failed write leaves the row pointing at the old name
        if let Err(e) = self.db.set_recording_file(recording_id, kind, Some(&new)) {
            log::error!(
                "Renamed {} to {} but failed to save it on recording {}: {:#}",
                old, new, recording.string_id, e
            );
            return Err(e);
        }

        log::info!("Renamed {} to {}", old, new);
        Ok(new)
    }

    // ===== Lookups =====

    /// Participants of the recording's transcription, joined with ", ".
    ///
    /// Empty when there is no transcription or the file is gone from disk.
    pub fn participants(&self, recording: &Recording) -> Result<String> {
        let file = match &recording.transcription_file {
            Some(file) => file,
            None => return Ok(String::new()),
        };

        let path = file.path(&self.storage)?;
        match self.reader.participants(&path) {
            Ok(participants) => Ok(participants.join(", ")),
            Err(e) if is_not_found(&e) => {
                log::debug!("Transcription missing for {}: {}", recording.string_id, file);
                Ok(String::new())
            }
            Err(e) => Err(e),
        }
    }

    /// Header of the recording's audio file
    pub fn probe_audio(&self, recording: &Recording) -> AudioProbe {
        let file = match &recording.audio_file {
            Some(file) => file,
            None => return AudioProbe::Unavailable,
        };

        let header = file
            .path(&self.storage)
            .and_then(|path| self.probe.probe(&path));

        match header {
            Ok(header) => AudioProbe::Success(header),
            Err(e) => {
                log::debug!("No audio header for {}: {:#}", recording.string_id, e);
                AudioProbe::Unavailable
            }
        }
    }

    /// Audio header summary, or "None" when it cannot be read
    pub fn audio_data(&self, recording: &Recording) -> String {
        self.probe_audio(recording).to_string()
    }

    // ===== Attachments =====

    /// Store a transcription under `transcriptions/` and attach it to the recording
    pub fn attach_transcription(
        &self,
        recording_id: &str,
        file_name: &str,
        contents: &[u8],
    ) -> Result<FileRef> {
        self.attach_file(recording_id, RecordingFileKind::Transcription, file_name, contents)
    }

    /// Store an audio file under `audio/` and attach it to the recording
    pub fn attach_audio(&self, recording_id: &str, file_name: &str, contents: &[u8]) -> Result<FileRef> {
        self.attach_file(recording_id, RecordingFileKind::Audio, file_name, contents)
    }

    fn attach_file(
        &self,
        recording_id: &str,
        kind: RecordingFileKind,
        file_name: &str,
        contents: &[u8],
    ) -> Result<FileRef> {
        let recording = self.require_recording(recording_id)?;

        let file_name = sanitize_file_name(file_name);
        if file_name.is_empty() || file_name == "." || file_name == ".." {
            bail!("Invalid file name for upload");
        }

        let name = format!("{}/{}", kind.upload_dir(), file_name);
        let file = self.storage.save(&name, contents)?;

        if let Err(e) = self.db.set_recording_file(recording_id, kind, Some(&file)) {
            log::error!("Stored {} but failed to attach it to {}: {:#}", file, recording.string_id, e);
            return Err(e);
        }

        if let Some(previous) = kind.file_of(&recording) {
            if previous != &file {
                // The row already points at the new file; a stale old file is only logged
                match self.storage.delete(previous.name()) {
                    Ok(()) => log::info!("Replaced {} with {} on {}", previous, file, recording.string_id),
                    Err(e) => log::warn!("Failed to remove replaced file {}: {:#}", previous, e),
                }
            }
        }

        Ok(file)
    }

    /// Clear the transcription reference and delete the stored file
    pub fn detach_transcription(&self, recording_id: &str) -> Result<()> {
        self.detach_file(recording_id, RecordingFileKind::Transcription)
    }

    /// Clear the audio reference and delete the stored file
    pub fn detach_audio(&self, recording_id: &str) -> Result<()> {
        self.detach_file(recording_id, RecordingFileKind::Audio)
    }

    fn detach_file(&self, recording_id: &str, kind: RecordingFileKind) -> Result<()> {
        let recording = self.require_recording(recording_id)?;
        let file = match kind.file_of(&recording) {
            Some(file) => file,
            None => return Ok(()),
        };

        self.db.set_recording_file(recording_id, kind, None)?;
        self.storage.delete(file.name())?;

        log::info!("Detached {} from {}", file, recording.string_id);
        Ok(())
    }
}

fn is_not_found(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<std::io::Error>())
        .any(|io_err| io_err.kind() == ErrorKind::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::{tempdir, TempDir};

    fn create_test_store() -> (TempDir, CorpusStore) {
        let dir = tempdir().unwrap();
        let store = CorpusStore::open(&StoreConfig::in_dir(dir.path())).unwrap();
        (dir, store)
    }

    fn create_recording(store: &CorpusStore, string_id: &str) -> Recording {
        let recording = Recording::new(string_id);
        store.db().create_recording(&recording).unwrap();
        recording
    }

    fn reload(store: &CorpusStore, id: &str) -> Recording {
        store.db().get_recording(id).unwrap().unwrap()
    }

    fn wav_bytes(dir: &Path) -> Vec<u8> {
        let path = dir.join("fixture.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..160 {
            writer.write_sample(i as i16).unwrap();
        }
        writer.finalize().unwrap();
        std::fs::read(&path).unwrap()
    }

    const EAF: &str = r#"<ANNOTATION_DOCUMENT>
<TIER LINGUISTIC_TYPE_REF="words" PARTICIPANT="AB" TIER_ID="AB_words"/>
<TIER LINGUISTIC_TYPE_REF="words" PARTICIPANT="IV" TIER_ID="IV_words"/>
<TIER LINGUISTIC_TYPE_REF="words" PARTICIPANT="AB" TIER_ID="AB_rus"/>
</ANNOTATION_DOCUMENT>"#;

    #[test]
    fn test_rename_transcription_keeps_text_after_first_dot() {
        let (_dir, store) = create_test_store();
        let recording = create_recording(&store, "2016-07-13_a");
        store.attach_transcription(&recording.id, "rec.2023.eaf", EAF.as_bytes()).unwrap();

        let renamed = store.rename_transcription_file(&recording.id, "foo").unwrap();
        assert_eq!(renamed.name(), "transcriptions/foo.2023.eaf");

        let stored = reload(&store, &recording.id);
        assert_eq!(stored.transcription_file, Some(renamed.clone()));
        assert!(renamed.exists(store.storage()));
        assert!(!store.storage().exists("transcriptions/rec.2023.eaf"));
    }

    #[test]
    fn test_rename_audio() {
        let (dir, store) = create_test_store();
        let recording = create_recording(&store, "2016-07-13_a");
        store.attach_audio(&recording.id, "take1.wav", &wav_bytes(dir.path())).unwrap();

        let renamed = store.rename_audio_file(&recording.id, "2016-07-13_a").unwrap();
        assert_eq!(renamed.name(), "audio/2016-07-13_a.wav");
        assert_eq!(reload(&store, &recording.id).audio_file, Some(renamed));
    }

    #[test]
    fn test_rename_errors() {
        let (_dir, store) = create_test_store();
        let recording = create_recording(&store, "2016-07-13_a");

        // No file attached
        assert!(store.rename_transcription_file(&recording.id, "foo").is_err());
        assert!(store.rename_audio_file("rec_missing", "foo").is_err());

        // No extension
        store.attach_transcription(&recording.id, "README", b"x").unwrap();
        assert!(store.rename_transcription_file(&recording.id, "foo").is_err());

        // Source gone from disk
        let other = create_recording(&store, "2016-07-13_b");
        let file = store.attach_transcription(&other.id, "b.eaf", b"x").unwrap();
        store.storage().delete(file.name()).unwrap();
        assert!(store.rename_transcription_file(&other.id, "foo").is_err());
        assert_eq!(reload(&store, &other.id).transcription_file, Some(file));
    }

    #[test]
    fn test_participants() {
        let (_dir, store) = create_test_store();
        let recording = create_recording(&store, "2016-07-13_a");
        assert_eq!(store.participants(&recording).unwrap(), "");

        store.attach_transcription(&recording.id, "a.eaf", EAF.as_bytes()).unwrap();
        let recording = reload(&store, &recording.id);
        assert_eq!(store.participants(&recording).unwrap(), "AB, IV");
    }

    #[test]
    fn test_participants_missing_file_is_empty() {
        let (_dir, store) = create_test_store();
        let mut recording = create_recording(&store, "2016-07-13_a");
        recording.transcription_file = Some(FileRef::new("transcriptions/gone.eaf"));

        assert_eq!(store.participants(&recording).unwrap(), "");
    }

    #[test]
    fn test_participants_other_errors_propagate() {
        let (_dir, store) = create_test_store();
        let mut recording = create_recording(&store, "2016-07-13_a");
        // A directory in place of the file
        std::fs::create_dir_all(store.storage().root().join("transcriptions/dir.eaf")).unwrap();
        recording.transcription_file = Some(FileRef::new("transcriptions/dir.eaf"));

        assert!(store.participants(&recording).is_err());
    }

    #[test]
    fn test_audio_data() {
        let (dir, store) = create_test_store();
        let recording = create_recording(&store, "2016-07-13_a");
        assert_eq!(store.audio_data(&recording), "None");

        store.attach_audio(&recording.id, "a.wav", &wav_bytes(dir.path())).unwrap();
        let recording = reload(&store, &recording.id);
        assert_eq!(
            store.audio_data(&recording),
            "filetype: wav, framerate: 16000, nchannels: 1, nframes: 160, sampwidth: 16"
        );
    }

    #[test]
    fn test_audio_data_corrupt_file_is_none() {
        let (_dir, store) = create_test_store();
        let recording = create_recording(&store, "2016-07-13_a");
        store.attach_audio(&recording.id, "broken.wav", b"garbage bytes").unwrap();

        let recording = reload(&store, &recording.id);
        assert_eq!(store.probe_audio(&recording), AudioProbe::Unavailable);
        assert_eq!(store.audio_data(&recording), "None");
    }

    #[test]
    fn test_attach_replaces_previous_file() {
        let (_dir, store) = create_test_store();
        let recording = create_recording(&store, "2016-07-13_a");

        store.attach_transcription(&recording.id, "first.eaf", b"1").unwrap();
        let second = store.attach_transcription(&recording.id, "second.eaf", b"2").unwrap();

        assert!(!store.storage().exists("transcriptions/first.eaf"));
        assert_eq!(reload(&store, &recording.id).transcription_file, Some(second));

        // Same name again overwrites in place
        store.attach_transcription(&recording.id, "second.eaf", b"3").unwrap();
        let path = store.storage().path("transcriptions/second.eaf").unwrap();
        assert_eq!(std::fs::read(path).unwrap(), b"3");
    }

    #[test]
    fn test_attach_succeeds_when_old_file_cannot_be_removed() {
        let (_dir, store) = create_test_store();
        let recording = create_recording(&store, "2016-07-13_a");

        // A directory where the previous transcription should be
        let stale = FileRef::new("transcriptions/stale.eaf");
        std::fs::create_dir_all(stale.path(store.storage()).unwrap()).unwrap();
        store
            .db()
            .set_recording_file(&recording.id, RecordingFileKind::Transcription, Some(&stale))
            .unwrap();

        let file = store.attach_transcription(&recording.id, "new.eaf", EAF.as_bytes()).unwrap();
        assert_eq!(reload(&store, &recording.id).transcription_file, Some(file));
        assert!(store.storage().path("transcriptions/stale.eaf").unwrap().is_dir());
    }

    #[test]
    fn test_attach_rejects_bad_names_and_unknown_recordings() {
        let (_dir, store) = create_test_store();
        let recording = create_recording(&store, "2016-07-13_a");

        assert!(store.attach_audio(&recording.id, "  ", b"x").is_err());
        assert!(store.attach_audio(&recording.id, "..", b"x").is_err());
        assert!(store.attach_audio("rec_missing", "a.wav", b"x").is_err());
    }

    #[test]
    fn test_detach() {
        let (_dir, store) = create_test_store();
        let recording = create_recording(&store, "2016-07-13_a");
        let file = store.attach_audio(&recording.id, "a.wav", b"x").unwrap();

        store.detach_audio(&recording.id).unwrap();
        assert!(reload(&store, &recording.id).audio_file.is_none());
        assert!(!file.exists(store.storage()));

        // Nothing attached: no-op
        store.detach_audio(&recording.id).unwrap();
        store.detach_transcription(&recording.id).unwrap();
    }
}
