//! Async Control Plane over sessions (spec §4.9 / C9): creates sessions,
//! dispatches control operations under each session's own lock, and pulls
//! processed chunks. Grounded on `fingerprint-server/src/main.rs`'s
//! `Arc<RwLock<HashMap<...>>>` session registry pattern, adapted from a
//! single shared cache to one registry of per-session locks plus the two
//! caches shared read-only across all sessions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex as AsyncMutex, RwLock as AsyncRwLock};
use tracing::info;

use auralis_cache::{FingerprintCache, PresetCache};
use auralis_dsp::MasteringTarget;
use auralis_mastering::Preset;
use auralis_pcm::{PcmSource, TrackId};

use crate::chunk::{ChunkDescriptor, ProcessedChunk};
use crate::config::EngineConfig;
use crate::error::StreamError;
use crate::session::{ContentProfile, Session, SessionId, SessionState};

type PresetCacheEntry = (MasteringTarget, Arc<[ChunkDescriptor]>);

pub struct StreamEngine {
    config: EngineConfig,
    fingerprint_cache: Arc<FingerprintCache>,
    preset_cache: Arc<PresetCache<Preset, PresetCacheEntry>>,
    sessions: AsyncRwLock<HashMap<SessionId, Arc<AsyncMutex<Session>>>>,
    next_id: AtomicU64,
}

impl StreamEngine {
    pub fn new(config: EngineConfig, fingerprint_cache_dir: impl AsRef<std::path::Path>) -> Result<Self, StreamError> {
        if !config.is_valid() {
            return Err(StreamError::InvalidConfig("engine configuration failed validation".into()));
        }
        let fingerprint_cache = FingerprintCache::open(fingerprint_cache_dir, config.fingerprint_cache_max_bytes)
            .map_err(|err| StreamError::InvalidConfig(err.to_string()))?;
        Ok(Self {
            fingerprint_cache: Arc::new(fingerprint_cache),
            preset_cache: Arc::new(PresetCache::new(config.preset_cache_max_entries)),
            sessions: AsyncRwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            config,
        })
    }

    pub async fn create_session(&self) -> SessionId {
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let session = Session::new(id, self.config);
        self.sessions.write().await.insert(id, Arc::new(AsyncMutex::new(session)));
        info!(session = id.0, "session created");
        id
    }

    async fn handle(&self, id: SessionId) -> Result<Arc<AsyncMutex<Session>>, StreamError> {
        self.sessions.read().await.get(&id).cloned().ok_or(StreamError::SessionNotFound(id.0))
    }

    /// Track-to-`PcmSource` resolution is out of scope for this engine
    /// (no library or metadata store, spec §1's Non-goals); the caller
    /// supplies an already-opened source alongside its `TrackId`.
    pub async fn load(&self, id: SessionId, track_id: TrackId, source: Arc<dyn PcmSource>) -> Result<(), StreamError> {
        let handle = self.handle(id).await?;
        let mut session = handle.lock().await;
        session.load(track_id, source, &self.fingerprint_cache, &self.preset_cache)
    }

    pub async fn set_preset(&self, id: SessionId, preset: Preset) -> Result<(), StreamError> {
        let handle = self.handle(id).await?;
        let mut session = handle.lock().await;
        session.set_preset(preset, &self.preset_cache);
        Ok(())
    }

    pub async fn set_intensity(&self, id: SessionId, intensity: f32) -> Result<(), StreamError> {
        let handle = self.handle(id).await?;
        handle.lock().await.set_intensity(intensity);
        Ok(())
    }

    pub async fn seek(&self, id: SessionId, position_seconds: f32) -> Result<(), StreamError> {
        let handle = self.handle(id).await?;
        handle.lock().await.seek(position_seconds);
        Ok(())
    }

    pub async fn pull_next_chunk(&self, id: SessionId) -> Result<Option<ProcessedChunk>, StreamError> {
        let handle = self.handle(id).await?;
        let mut session = handle.lock().await;
        session.pull_next_chunk()
    }

    pub async fn content_profile(&self, id: SessionId) -> Result<ContentProfile, StreamError> {
        let handle = self.handle(id).await?;
        Ok(handle.lock().await.content_profile())
    }

    pub async fn session_state(&self, id: SessionId) -> Result<SessionState, StreamError> {
        let handle = self.handle(id).await?;
        Ok(handle.lock().await.state())
    }

    /// Terminates the session and drops its lookahead queue. The session
    /// remains addressable (returns `Cancelled` on further queries)
    /// rather than disappearing from the registry, so a racing caller
    /// never sees `SessionNotFound` for a session it just cancelled.
    pub async fn cancel(&self, id: SessionId) -> Result<(), StreamError> {
        let handle = self.handle(id).await?;
        handle.lock().await.cancel();
        Ok(())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auralis_pcm::SineTestSource;

    async fn fresh_engine() -> (StreamEngine, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = EngineConfig::default();
        config.chunk_duration_seconds = 1.0;
        config.crossfade_duration_seconds = 0.1;
        let engine = StreamEngine::new(config, dir.path()).unwrap();
        (engine, dir)
    }

    #[tokio::test]
    async fn unknown_session_returns_not_found() {
        let (engine, _dir) = fresh_engine().await;
        let err = engine.set_intensity(SessionId(999), 0.5).await.unwrap_err();
        assert_eq!(err, StreamError::SessionNotFound(999));
    }

    #[tokio::test]
    async fn create_load_pull_roundtrip() {
        let (engine, _dir) = fresh_engine().await;
        let id = engine.create_session().await;
        let source: Arc<dyn PcmSource> = Arc::new(SineTestSource::new(44100, 3.0, 440.0, 0.3));
        engine.load(id, TrackId::from_raw("sine-a"), source).await.unwrap();

        let chunk = engine.pull_next_chunk(id).await.unwrap().unwrap();
        assert_eq!(chunk.index, 0);
        assert_eq!(engine.session_state(id).await.unwrap(), SessionState::Streaming);
    }

    #[tokio::test]
    async fn cancel_makes_further_pulls_empty() {
        let (engine, _dir) = fresh_engine().await;
        let id = engine.create_session().await;
        let source: Arc<dyn PcmSource> = Arc::new(SineTestSource::new(44100, 3.0, 440.0, 0.3));
        engine.load(id, TrackId::from_raw("sine-b"), source).await.unwrap();
        engine.cancel(id).await.unwrap();

        assert!(engine.pull_next_chunk(id).await.unwrap().is_none());
        assert_eq!(engine.session_state(id).await.unwrap(), SessionState::Cancelled);
    }

    #[tokio::test]
    async fn preset_cache_is_reused_across_sessions_for_the_same_track() {
        let (engine, _dir) = fresh_engine().await;
        let track_id = TrackId::from_raw("shared-track");

        let id_a = engine.create_session().await;
        let source_a: Arc<dyn PcmSource> = Arc::new(SineTestSource::new(44100, 2.0, 220.0, 0.3));
        engine.load(id_a, track_id.clone(), source_a).await.unwrap();
        let profile_a = engine.content_profile(id_a).await.unwrap();

        let id_b = engine.create_session().await;
        let source_b: Arc<dyn PcmSource> = Arc::new(SineTestSource::new(44100, 2.0, 220.0, 0.3));
        engine.load(id_b, track_id, source_b).await.unwrap();
        let profile_b = engine.content_profile(id_b).await.unwrap();

        assert_eq!(profile_a.applied_target, profile_b.applied_target);
    }
}
