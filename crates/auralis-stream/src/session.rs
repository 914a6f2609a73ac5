//! Per-session state machine and chunk production (spec §4.7).
//!
//! A `Session` is the Chunked Stream Engine's exclusive owner of one
//! consumer's processor state, dry/wet gains, and crossfade tails; the
//! fingerprint and preset caches it reads from are shared and passed in
//! by reference from [`crate::engine::StreamEngine`].

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::{debug, warn};

use auralis_cache::{FingerprintCache, PresetCache};
use auralis_dsp::MasteringTarget;
use auralis_fingerprint::{BatchExtractor, Fingerprint, FingerprintExtractor};
use auralis_mastering::{generate, HybridProcessor, Preset};
use auralis_pcm::{AudioBlock, PcmSource, TrackId};

use crate::chunk::{chunk_frames_for, compute_chunk_descriptors, crossfade_frames_for, ChunkDescriptor, ProcessedChunk};
use crate::config::EngineConfig;
use crate::error::StreamError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loading,
    Ready,
    Streaming,
    Paused,
    Seeking,
    Cancelled,
    Completed,
}

/// Read-only snapshot exposed to upstream layers for UI display.
#[derive(Debug, Clone)]
pub struct ContentProfile {
    pub fingerprint: Option<Fingerprint>,
    pub preset: Preset,
    pub applied_target: Option<MasteringTarget>,
    pub warning: bool,
}

type PresetCacheEntry = (MasteringTarget, Arc<[ChunkDescriptor]>);

pub struct Session {
    id: SessionId,
    state: SessionState,
    config: EngineConfig,

    source: Option<Arc<dyn PcmSource>>,
    track_id: Option<TrackId>,
    sample_rate: u32,
    total_frames: u64,

    chunk_frames: u64,
    crossfade_frames: u64,
    context_lead_frames: u64,
    context_trail_frames: u64,
    descriptors: Arc<[ChunkDescriptor]>,

    preset: Preset,
    intensity: f32,
    processor: Option<HybridProcessor>,
    fingerprint: Option<Fingerprint>,
    current_target: MasteringTarget,
    last_emitted_target: Option<MasteringTarget>,

    next_chunk_index: u32,
    pending_fade_in_frames: u64,
    warning: bool,
    lookahead: VecDeque<ProcessedChunk>,
}

impl Session {
    pub fn new(id: SessionId, config: EngineConfig) -> Self {
        Self {
            id,
            state: SessionState::Idle,
            config,
            source: None,
            track_id: None,
            sample_rate: 44100,
            total_frames: 0,
            chunk_frames: 0,
            crossfade_frames: 0,
            context_lead_frames: 0,
            context_trail_frames: 0,
            descriptors: Arc::from(Vec::new()),
            preset: Preset::default(),
            intensity: 1.0,
            processor: None,
            fingerprint: None,
            current_target: MasteringTarget::pass_through(),
            last_emitted_target: None,
            next_chunk_index: 0,
            pending_fade_in_frames: 0,
            warning: false,
            lookahead: VecDeque::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Opens the track for streaming. Fetches (or computes) the
    /// fingerprint, resolves the mastering target for the current preset,
    /// and derives chunk descriptors. Transitions to `Ready` on success,
    /// `Cancelled` if the source reports zero frames.
    pub fn load(
        &mut self,
        track_id: TrackId,
        source: Arc<dyn PcmSource>,
        fingerprint_cache: &FingerprintCache,
        preset_cache: &PresetCache<Preset, PresetCacheEntry>,
    ) -> Result<(), StreamError> {
        self.state = SessionState::Loading;

        let sample_rate = source.sample_rate();
        let total_frames = source.frame_count();
        if total_frames == 0 {
            self.state = SessionState::Cancelled;
            return Err(StreamError::InvalidConfig("source has zero frames".into()));
        }

        self.sample_rate = sample_rate;
        self.total_frames = total_frames;
        self.track_id = Some(track_id.clone());
        self.source = Some(source);

        self.chunk_frames = chunk_frames_for(self.config.chunk_duration_seconds, sample_rate);
        self.crossfade_frames = crossfade_frames_for(self.config.crossfade_duration_seconds, sample_rate);
        self.context_lead_frames = (self.config.context_lead_seconds * sample_rate as f32) as u64;
        self.context_trail_frames = (self.config.context_trail_seconds * sample_rate as f32) as u64;

        self.fingerprint = Some(self.fingerprint_for(&track_id, fingerprint_cache, preset_cache));
        self.resolve_target(preset_cache);

        self.processor = Some(HybridProcessor::with_oversample(sample_rate, self.config.true_peak_oversample));
        if let Some(processor) = self.processor.as_mut() {
            processor.set_target(self.current_target);
        }

        self.next_chunk_index = 0;
        self.lookahead.clear();
        self.state = SessionState::Ready;
        debug!(session = self.id.0, chunks = self.descriptors.len(), "session loaded");
        Ok(())
    }

    /// Degrades to a zero fingerprint (and sets the session warning flag)
    /// on extraction failure per spec §4.7's failure semantics, rather
    /// than failing the stream.
    fn fingerprint_for(
        &mut self,
        track_id: &TrackId,
        fingerprint_cache: &FingerprintCache,
        preset_cache: &PresetCache<Preset, PresetCacheEntry>,
    ) -> Fingerprint {
        let cached = fingerprint_cache.get(track_id);
        if let Some(entry) = &cached {
            if entry.confidence >= 1.0 {
                return entry.fingerprint;
            }
        }

        let Some(source) = self.source.as_ref() else {
            self.warning = true;
            return cached.map(|e| e.fingerprint).unwrap_or_else(|| Fingerprint::from_vec25([0.0; 25]));
        };

        match BatchExtractor.analyze(source.as_ref()) {
            Ok(result) => {
                let prior_confidence = cached.as_ref().map(|e| e.confidence).unwrap_or(0.0);
                let entry = auralis_cache::FingerprintEntry::new(track_id.clone(), result.fingerprint, result.confidence);
                let _ = fingerprint_cache.put(entry);
                if result.confidence > prior_confidence {
                    // A higher-confidence re-extraction invalidates every
                    // cached preset target for this track, not just the
                    // one this session currently has selected.
                    preset_cache.invalidate_track(track_id);
                    result.fingerprint
                } else {
                    cached.map(|e| e.fingerprint).unwrap_or(result.fingerprint)
                }
            }
            Err(err) => {
                warn!(session = self.id.0, %err, "fingerprint extraction failed, degrading to pass-through");
                self.warning = true;
                cached.map(|e| e.fingerprint).unwrap_or_else(|| Fingerprint::from_vec25([0.0; 25]))
            }
        }
    }

    fn resolve_target(&mut self, preset_cache: &PresetCache<Preset, PresetCacheEntry>) {
        let track_id = self.track_id.clone().expect("load sets track_id before resolve_target");
        if let Some((target, descriptors)) = preset_cache.get(&track_id, &self.preset) {
            self.current_target = target;
            self.descriptors = descriptors;
            return;
        }

        let fingerprint = self.fingerprint.unwrap_or_else(|| Fingerprint::from_vec25([0.0; 25]));
        let target = generate(&fingerprint, self.preset);
        let descriptors: Arc<[ChunkDescriptor]> = compute_chunk_descriptors(self.total_frames, self.chunk_frames).into();

        preset_cache.put(track_id, self.preset, (target, descriptors.clone()));
        self.current_target = target;
        self.descriptors = descriptors;
    }

    /// Takes effect no later than the next chunk whose index is strictly
    /// greater than the one in flight (spec §5's ordering guarantee) —
    /// trivially satisfied here since descriptor pulls are synchronous
    /// and this assigns before the next `pull_next_chunk` call runs.
    pub fn set_preset(&mut self, preset: Preset, preset_cache: &PresetCache<Preset, PresetCacheEntry>) {
        if preset == self.preset {
            return;
        }
        self.preset = preset;
        self.resolve_target(preset_cache);
        self.lookahead.clear();
    }

    pub fn set_intensity(&mut self, intensity: f32) {
        self.intensity = intensity.clamp(0.0, 1.0);
    }

    /// Invalidates the lookahead queue, resets the processor's envelope
    /// states to a safe baseline, and realigns `next_chunk_index`. Arms a
    /// fade-in if the seek lands near the start of the track and no
    /// leading context is available.
    pub fn seek(&mut self, position_seconds: f32) {
        if self.chunk_frames == 0 {
            return;
        }
        self.state = SessionState::Seeking;
        self.lookahead.clear();
        if let Some(processor) = self.processor.as_mut() {
            processor.reset();
            processor.set_target(self.current_target);
        }

        let to_frame = (position_seconds.max(0.0) * self.sample_rate as f32) as u64;
        self.next_chunk_index = (to_frame / self.chunk_frames) as u32;

        let chunk_start = self.next_chunk_index as u64 * self.chunk_frames;
        let available_context = chunk_start.min(self.context_lead_frames);
        if available_context < self.context_lead_frames {
            let twenty_ms = (0.020 * self.sample_rate as f32) as u64;
            self.pending_fade_in_frames = available_context.min(twenty_ms);
        }

        self.state = SessionState::Streaming;
    }

    pub fn cancel(&mut self) {
        self.lookahead.clear();
        self.state = SessionState::Cancelled;
    }

    pub fn content_profile(&self) -> ContentProfile {
        ContentProfile {
            fingerprint: self.fingerprint,
            preset: self.preset,
            applied_target: self.last_emitted_target.or(Some(self.current_target)),
            warning: self.warning,
        }
    }

    /// Produces at most one `ProcessedChunk`, or `None` at end of stream.
    /// Idempotent once `Cancelled`/`Completed`: returns `None` forever
    /// after, per spec §8's "cancellation leaves no stream residue".
    pub fn pull_next_chunk(&mut self) -> Result<Option<ProcessedChunk>, StreamError> {
        if matches!(self.state, SessionState::Cancelled | SessionState::Completed) {
            return Ok(None);
        }
        if self.state == SessionState::Ready {
            self.state = SessionState::Streaming;
        }

        self.fill_lookahead()?;
        Ok(self.lookahead.pop_front())
    }

    fn fill_lookahead(&mut self) -> Result<(), StreamError> {
        // §5's "one in-flight chunk per session" decision: speculative
        // chunks are computed sequentially, one at a time, rather than
        // handed to a worker pool — a pool would need to clone processor
        // state across workers (option (a) in §5), which this
        // implementation does not do. Parallelism across sessions comes
        // from each session's own lock, not from work-stealing inside one.
        while self.lookahead.len() < self.config.lookahead_queue_size.max(1) {
            if matches!(self.state, SessionState::Cancelled | SessionState::Completed) {
                break;
            }
            match self.produce_next_chunk()? {
                Some(chunk) => self.lookahead.push_back(chunk),
                None => break,
            }
        }
        Ok(())
    }

    fn produce_next_chunk(&mut self) -> Result<Option<ProcessedChunk>, StreamError> {
        let Some(descriptor) = self.descriptors.get(self.next_chunk_index as usize).copied() else {
            self.state = SessionState::Completed;
            return Ok(None);
        };
        let source = self.source.clone().expect("descriptors imply a loaded source");

        let read_start = descriptor.start_frame.saturating_sub(self.context_lead_frames);
        let read_end = (descriptor.start_frame + descriptor.frame_count + self.context_trail_frames).min(self.total_frames);
        let read_len = read_end - read_start;

        let block = self.read_with_retry(source.as_ref(), read_start, read_len, descriptor.index)?;

        match self.last_emitted_target {
            Some(previous) if previous != self.current_target => {
                // A mid-stream target change (preset switch) gets a
                // dedicated gain-smoothing corridor at least as long as
                // the crossfade duration, fading the outgoing target's
                // processing into the incoming one rather than cutting
                // over instantly (spec §4.7).
                if let Some(processor) = self.processor.as_mut() {
                    processor.set_target_with_corridor(self.current_target, self.crossfade_frames.max(1));
                }
            }
            None => {
                if let Some(processor) = self.processor.as_mut() {
                    processor.set_target(self.current_target);
                }
            }
            _ => {}
        }

        let processor = self.processor.as_mut().expect("load initializes processor");
        let (processed, mut warned) = sanitize_or_process(processor, &block, self.intensity);

        let trim_offset = (descriptor.start_frame - read_start) as usize;
        let mut trimmed = processed.slice(trim_offset, descriptor.frame_count as usize, descriptor.start_frame);

        if self.pending_fade_in_frames > 0 {
            trimmed = apply_fade_in(&trimmed, self.pending_fade_in_frames as usize);
            self.pending_fade_in_frames = 0;
        }

        if !trimmed.is_finite() {
            warned = true;
            trimmed = AudioBlock::silence(trimmed.frame_count(), trimmed.sample_rate(), trimmed.start_frame());
        }

        let crossfade_head_frames = if descriptor.has_leading_context { self.crossfade_frames.min(descriptor.frame_count) } else { 0 };
        let crossfade_tail_frames = if descriptor.has_trailing_context { self.crossfade_frames.min(descriptor.frame_count) } else { 0 };

        let chunk = ProcessedChunk {
            index: descriptor.index,
            peak_dbfs: trimmed.peak_dbfs(),
            rms_dbfs: trimmed.rms_dbfs(),
            pcm: trimmed,
            applied_target: self.current_target,
            crossfade_head_frames,
            crossfade_tail_frames,
            warning: warned || self.warning,
        };

        self.last_emitted_target = Some(self.current_target);
        self.next_chunk_index += 1;
        if self.next_chunk_index as usize >= self.descriptors.len() {
            self.state = SessionState::Completed;
        }

        Ok(Some(chunk))
    }

    /// `PcmSource::read_frames` is infallible by contract (decode
    /// failures surface once at `open`, spec §4.1); the only failure
    /// mode this trait can signal here is an unexpectedly empty block
    /// when frames were expected, which this retries once before
    /// escalating to `ChunkIoFailed`.
    fn read_with_retry(&mut self, source: &dyn PcmSource, start: u64, len: u64, chunk_index: u32) -> Result<AudioBlock, StreamError> {
        let block = source.read_frames(start, len);
        if !block.is_empty() || len == 0 {
            return Ok(block);
        }
        let retried = source.read_frames(start, len);
        if retried.is_empty() {
            self.state = SessionState::Cancelled;
            return Err(StreamError::ChunkIoFailed { chunk_index, message: "PCM source returned no frames".into() });
        }
        Ok(retried)
    }
}

fn sanitize_or_process(processor: &mut HybridProcessor, block: &AudioBlock, intensity: f32) -> (AudioBlock, bool) {
    let (clean, warned) = auralis_dsp::sanitize(block);
    (processor.process(clean, intensity), warned)
}

fn apply_fade_in(block: &AudioBlock, fade_frames: usize) -> AudioBlock {
    let fade_frames = fade_frames.min(block.frame_count());
    if fade_frames == 0 {
        return block.clone();
    }
    let frames: Vec<(f32, f32)> = block
        .frames()
        .iter()
        .enumerate()
        .map(|(i, &(l, r))| {
            if i < fade_frames {
                let gain = i as f32 / fade_frames as f32;
                (l * gain, r * gain)
            } else {
                (l, r)
            }
        })
        .collect();
    AudioBlock::new(frames, block.sample_rate(), block.start_frame())
}
