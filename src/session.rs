// ============================================================================
// EDIT SESSION: one source image, its current buffer and filter history
// ============================================================================
//
// Every operation runs in three steps:
//   prepare  (caller thread)  guard checks + snapshot of the inputs
//   run      (any thread)     the pixel work / file I/O, no session access
//   commit   (caller thread)  install the result and move the history cursor
//
// The synchronous API chains all three; `worker::SessionRunner` runs the
// middle step on a background pool. Nothing is modified before commit, so a
// failed step leaves the session exactly as it was.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use uuid::Uuid;

use crate::canvas::PixelBuffer;
use crate::error::{EditError, Result, Transition};
use crate::history::FilterHistory;
use crate::io::{self, DEFAULT_JPEG_QUALITY, MaxDimensions, SaveFormat};
use crate::ops::{Filter, replay};
use crate::settings::{DEFAULT_PREVIEW_HEIGHT, EditorSettings};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionOptions {
    /// Size limit for the editing buffer. Saving always works at full size.
    pub preview: MaxDimensions,
    pub jpeg_quality: u8,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            preview: MaxDimensions::height(DEFAULT_PREVIEW_HEIGHT),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl From<&EditorSettings> for SessionOptions {
    fn from(settings: &EditorSettings) -> Self {
        Self {
            preview: settings.preview_dimensions(),
            jpeg_quality: settings.jpeg_quality,
        }
    }
}

/// A request from the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Open(PathBuf),
    Apply(Filter),
    Undo,
    Redo,
    /// Write back to the file the image was opened from.
    Save,
    SaveAs(PathBuf),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Open(_) => "open",
            Command::Apply(_) => "apply",
            Command::Undo => "undo",
            Command::Redo => "redo",
            Command::Save => "save",
            Command::SaveAs(_) => "save as",
        }
    }
}

struct OpenImage {
    path: Option<PathBuf>,
    /// Full-resolution decode taken at open. Every save replays over this.
    source: Arc<PixelBuffer>,
    /// Replay base for the editing buffer; shares `source` unless scaled.
    original: Arc<PixelBuffer>,
    current: Arc<PixelBuffer>,
}

impl OpenImage {
    fn new(path: Option<PathBuf>, source: PixelBuffer, preview: Option<PixelBuffer>) -> Self {
        let source = Arc::new(source);
        let original = match preview {
            Some(preview) => Arc::new(preview),
            None => Arc::clone(&source),
        };
        Self {
            path,
            source,
            current: Arc::clone(&original),
            original,
        }
    }

    fn is_scaled(&self) -> bool {
        !Arc::ptr_eq(&self.source, &self.original)
    }
}

/// What `commit` has to do with a finished [`Work`].
#[derive(Clone, Debug)]
pub struct Ticket {
    action: PendingAction,
    generation: u64,
    version: u64,
}

impl Ticket {
    pub fn command_name(&self) -> &'static str {
        match self.action {
            PendingAction::Open => "open",
            PendingAction::Apply(_) => "apply",
            PendingAction::Undo => "undo",
            PendingAction::Redo => "redo",
            PendingAction::Save => "save",
        }
    }
}

#[derive(Clone, Debug)]
enum PendingAction {
    Open,
    Apply(Filter),
    Undo,
    Redo,
    Save,
}

enum WorkKind {
    Load {
        path: PathBuf,
        max: MaxDimensions,
    },
    Render {
        base: Arc<PixelBuffer>,
        filters: Vec<Filter>,
    },
    Save {
        source: Arc<PixelBuffer>,
        filters: Vec<Filter>,
        dest: PathBuf,
        format: SaveFormat,
        quality: u8,
    },
}

/// Self-contained unit of work: owns (or shares) everything it reads.
pub struct Work(WorkKind);

/// Result of [`Work::run`], handed back to [`EditSession::commit`].
pub struct Outcome(OutcomeKind);

enum OutcomeKind {
    Loaded {
        path: PathBuf,
        source: PixelBuffer,
        preview: Option<PixelBuffer>,
    },
    Rendered(PixelBuffer),
    Saved(PathBuf),
}

impl Work {
    pub fn run(self) -> Result<Outcome> {
        let kind = match self.0 {
            WorkKind::Load { path, max } => {
                let source = io::load_image(&path, MaxDimensions::NONE)?;
                let preview = io::fit_within(&source, max);
                OutcomeKind::Loaded {
                    path,
                    source,
                    preview,
                }
            }
            WorkKind::Render { base, filters } => OutcomeKind::Rendered(replay(&base, &filters)?),
            WorkKind::Save {
                source,
                filters,
                dest,
                format,
                quality,
            } => {
                let result = replay(&source, &filters)?;
                io::save_image_with(&result, &dest, format, quality)?;
                OutcomeKind::Saved(dest)
            }
        };
        Ok(Outcome(kind))
    }
}

/// Single open document: the pristine original, the current buffer and the
/// filter chain between them.
pub struct EditSession {
    id: Uuid,
    options: SessionOptions,
    image: Option<OpenImage>,
    history: FilterHistory,
    /// Bumped whenever a new image is installed.
    generation: u64,
    saved_version: Option<u64>,
    last_saved: Option<PathBuf>,
}

impl Default for EditSession {
    fn default() -> Self {
        Self::new(SessionOptions::default())
    }
}

impl EditSession {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            options,
            image: None,
            history: FilterHistory::new(),
            generation: 0,
            saved_version: None,
            last_saved: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    // ------------------------------------------------------------------------
    // Presentation-facing operations
    // ------------------------------------------------------------------------

    /// Open `path` as the new source image, discarding the previous one.
    pub fn open_image(&mut self, path: impl Into<PathBuf>) -> Result<&PixelBuffer> {
        self.execute(Command::Open(path.into()))
    }

    /// Install an already decoded buffer as the source image.
    /// `path` is where [`save_image`](Self::save_image) will write.
    pub fn open_buffer(&mut self, buffer: PixelBuffer, path: Option<PathBuf>) {
        self.install(OpenImage::new(path, buffer, None));
    }

    pub fn apply(&mut self, filter: Filter) -> Result<&PixelBuffer> {
        self.execute(Command::Apply(filter))
    }

    pub fn apply_color_filter(&mut self, red: i32, green: i32, blue: i32) -> Result<&PixelBuffer> {
        self.apply(Filter::color(red, green, blue))
    }

    pub fn apply_contrast_filter(&mut self, intensity: i32) -> Result<&PixelBuffer> {
        self.apply(Filter::contrast(intensity))
    }

    pub fn undo(&mut self) -> Result<&PixelBuffer> {
        self.execute(Command::Undo)
    }

    pub fn redo(&mut self) -> Result<&PixelBuffer> {
        self.execute(Command::Redo)
    }

    /// Replay the active chain over the full-size source and write it back
    /// to the file it came from.
    pub fn save_image(&mut self) -> Result<&PixelBuffer> {
        self.execute(Command::Save)
    }

    pub fn save_as(&mut self, path: impl Into<PathBuf>) -> Result<&PixelBuffer> {
        self.execute(Command::SaveAs(path.into()))
    }

    /// Prepare, run and commit `command` on the calling thread.
    pub fn execute(&mut self, command: Command) -> Result<&PixelBuffer> {
        let (ticket, work) = self.prepare(command)?;
        let outcome = work.run()?;
        self.commit(ticket, outcome)
    }

    // ------------------------------------------------------------------------
    // Split execution
    // ------------------------------------------------------------------------

    /// Check guards and snapshot the inputs for `command`. Does not modify the session.
    pub fn prepare(&self, command: Command) -> Result<(Ticket, Work)> {
        let (action, work) = match command {
            Command::Open(path) => (
                PendingAction::Open,
                WorkKind::Load {
                    path,
                    max: self.options.preview,
                },
            ),
            Command::Apply(filter) => {
                let image = self.require_image()?;
                if let Some(gap) = filter.parameter_gap() {
                    log_warn!("[session {}] {} applied as-is: {}", self.short_id(), filter, gap);
                }
                (
                    PendingAction::Apply(filter),
                    WorkKind::Render {
                        base: Arc::clone(&image.current),
                        filters: vec![filter],
                    },
                )
            }
            Command::Undo => {
                let image = self.require_image()?;
                if !self.history.can_undo() {
                    return Err(self.history.rejected(Transition::Undo));
                }
                let keep = self.history.undo_count() - 1;
                (
                    PendingAction::Undo,
                    WorkKind::Render {
                        base: Arc::clone(&image.original),
                        filters: self.history.active()[..keep].to_vec(),
                    },
                )
            }
            Command::Redo => {
                let image = self.require_image()?;
                if !self.history.can_redo() {
                    return Err(self.history.rejected(Transition::Redo));
                }
                let upto = self.history.undo_count() + 1;
                (
                    PendingAction::Redo,
                    WorkKind::Render {
                        base: Arc::clone(&image.original),
                        filters: self.history.entries()[..upto].to_vec(),
                    },
                )
            }
            Command::Save | Command::SaveAs(_) => {
                let image = self.require_image()?;
                let dest = match command {
                    Command::SaveAs(dest) => dest,
                    _ => image.path.clone().ok_or_else(|| {
                        EditError::InvalidState("image has no source path to save to".to_string())
                    })?,
                };
                let format = SaveFormat::from_path(&dest)?;
                (
                    PendingAction::Save,
                    WorkKind::Save {
                        source: Arc::clone(&image.source),
                        filters: self.history.active().to_vec(),
                        dest,
                        format,
                        quality: self.options.jpeg_quality,
                    },
                )
            }
        };
        let ticket = Ticket {
            action,
            generation: self.generation,
            version: self.history.version(),
        };
        Ok((ticket, Work(work)))
    }

    /// Install the outcome of a prepared command.
    ///
    /// Fails with `StaleResult` (leaving the session untouched) if the session
    /// changed since `prepare`.
    pub fn commit(&mut self, ticket: Ticket, outcome: Outcome) -> Result<&PixelBuffer> {
        if ticket.generation != self.generation || ticket.version != self.history.version() {
            return Err(EditError::StaleResult);
        }
        let id = self.short_id();
        match (ticket.action, outcome.0) {
            (
                PendingAction::Open,
                OutcomeKind::Loaded {
                    path,
                    source,
                    preview,
                },
            ) => {
                let (w, h) = source.dimensions();
                match &preview {
                    Some(p) => log_info!(
                        "[session {}] opened {} ({}x{}, editing {}x{} preview)",
                        id,
                        path.display(),
                        w,
                        h,
                        p.width(),
                        p.height()
                    ),
                    None => log_info!("[session {}] opened {} ({}x{})", id, path.display(), w, h),
                }
                self.install(OpenImage::new(Some(path), source, preview));
            }
            (PendingAction::Apply(filter), OutcomeKind::Rendered(buffer)) => {
                self.require_image()?;
                self.history.push(filter);
                self.set_current(buffer);
                log_info!("[session {}] applied {}", id, filter);
            }
            (PendingAction::Undo, OutcomeKind::Rendered(buffer)) => {
                self.require_image()?;
                let filter = self.history.undo()?;
                self.set_current(buffer);
                log_info!("[session {}] undo {}", id, filter);
            }
            (PendingAction::Redo, OutcomeKind::Rendered(buffer)) => {
                self.require_image()?;
                let filter = self.history.redo()?;
                self.set_current(buffer);
                log_info!("[session {}] redo {}", id, filter);
            }
            (PendingAction::Save, OutcomeKind::Saved(path)) => {
                log_info!(
                    "[session {}] saved {} filter(s) to {}",
                    id,
                    self.history.undo_count(),
                    path.display()
                );
                self.saved_version = Some(self.history.version());
                self.last_saved = Some(path);
            }
            _ => {
                return Err(EditError::InvalidState(
                    "outcome does not match the prepared command".to_string(),
                ));
            }
        }
        self.current().ok_or_else(EditError::no_image)
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    /// Buffer reflecting every filter up to the cursor.
    pub fn current(&self) -> Option<&PixelBuffer> {
        self.image.as_ref().map(|i| i.current.as_ref())
    }

    /// The as-loaded buffer every replay starts from.
    pub fn original(&self) -> Option<&PixelBuffer> {
        self.image.as_ref().map(|i| i.original.as_ref())
    }

    /// Full-resolution source that saves are rendered from.
    pub fn source_image(&self) -> Option<&PixelBuffer> {
        self.image.as_ref().map(|i| i.source.as_ref())
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.image.as_ref().and_then(|i| i.path.as_deref())
    }

    /// True when editing a downscaled preview of the source.
    pub fn is_preview(&self) -> bool {
        self.image.as_ref().is_some_and(OpenImage::is_scaled)
    }

    pub fn history(&self) -> &FilterHistory {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.has_image() && self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.has_image() && self.history.can_redo()
    }

    /// Active filter chain labels in application order.
    pub fn descriptions(&self) -> Vec<String> {
        self.history.active().iter().map(|f| f.description()).collect()
    }

    /// History changed since the image was opened or last saved.
    pub fn is_dirty(&self) -> bool {
        self.has_image() && self.saved_version != Some(self.history.version())
    }

    pub fn last_saved(&self) -> Option<&Path> {
        self.last_saved.as_deref()
    }

    // ------------------------------------------------------------------------

    fn install(&mut self, image: OpenImage) {
        self.image = Some(image);
        self.history.clear();
        self.generation += 1;
        self.saved_version = Some(self.history.version());
        self.last_saved = None;
    }

    fn set_current(&mut self, buffer: PixelBuffer) {
        if let Some(image) = self.image.as_mut() {
            image.current = Arc::new(buffer);
        }
    }

    fn require_image(&self) -> Result<&OpenImage> {
        self.image.as_ref().ok_or_else(EditError::no_image)
    }

    fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn scenario_image() -> PixelBuffer {
        PixelBuffer::from_rows(&[
            vec![[200, 100, 50], [10, 10, 10]],
            vec![[0, 0, 0], [255, 255, 255]],
        ])
        .unwrap()
    }

    fn session() -> EditSession {
        let mut s = EditSession::default();
        s.open_buffer(scenario_image(), None);
        s
    }

    #[test]
    fn apply_records_filter_and_replaces_current() {
        let mut s = session();
        let out = s.apply_color_filter(128, 255, 0).unwrap();
        assert_eq!(out.pixel(0, 0), Rgb([100, 100, 0]));
        assert_eq!(s.history().cursor(), Some(0));
        assert_eq!(s.original().unwrap(), &scenario_image());
    }

    #[test]
    fn undo_restores_exact_previous_buffer() {
        let mut s = session();
        s.apply_color_filter(128, 255, 0).unwrap();
        let before = s.current().unwrap().clone();
        s.apply_contrast_filter(20).unwrap();
        assert_eq!(s.current().unwrap().pixel(0, 0), Rgb([80, 80, 0]));
        let restored = s.undo().unwrap();
        assert_eq!(restored, &before);
    }

    #[test]
    fn redo_replays_the_dropped_filter() {
        let mut s = session();
        s.apply_color_filter(128, 255, 0).unwrap();
        s.apply_contrast_filter(20).unwrap();
        let head = s.current().unwrap().clone();
        s.undo().unwrap();
        s.undo().unwrap();
        assert_eq!(s.current().unwrap(), &scenario_image());
        s.redo().unwrap();
        assert_eq!(s.redo().unwrap(), &head);
    }

    #[test]
    fn undo_at_empty_history_is_rejected_and_state_kept() {
        let mut s = session();
        let err = s.undo().unwrap_err();
        assert!(matches!(err, EditError::InvalidTransition { action: Transition::Undo, .. }));
        assert_eq!(s.current().unwrap(), &scenario_image());
        assert_eq!(s.history().cursor(), None);
    }

    #[test]
    fn redo_at_head_is_rejected_and_state_kept() {
        let mut s = session();
        s.apply_contrast_filter(20).unwrap();
        let head = s.current().unwrap().clone();
        let version = s.history().version();
        let err = s.redo().unwrap_err();
        assert!(matches!(err, EditError::InvalidTransition { action: Transition::Redo, .. }));
        assert_eq!(s.current().unwrap(), &head);
        assert_eq!(s.history().version(), version);
    }

    #[test]
    fn operations_without_an_image_are_invalid_state() {
        let mut s = EditSession::default();
        assert!(matches!(s.apply_contrast_filter(1), Err(EditError::InvalidState(_))));
        assert!(matches!(s.undo(), Err(EditError::InvalidState(_))));
        assert!(matches!(s.save_image(), Err(EditError::InvalidState(_))));
        assert!(!s.can_undo());
    }

    #[test]
    fn empty_buffer_apply_fails_without_touching_history() {
        let mut s = EditSession::default();
        s.open_buffer(PixelBuffer::new(0, 0), None);
        assert!(matches!(s.apply_contrast_filter(5), Err(EditError::InvalidState(_))));
        assert!(s.history().is_empty());
    }

    #[test]
    fn apply_after_undo_truncates_redo() {
        let mut s = session();
        s.apply_contrast_filter(20).unwrap();
        s.apply_contrast_filter(30).unwrap();
        s.undo().unwrap();
        s.apply_color_filter(255, 0, 255).unwrap();
        assert_eq!(s.history().len(), 2);
        assert!(!s.can_redo());
        assert_eq!(
            s.descriptions(),
            vec!["Contrast Filter (20)".to_string(), "Color Filter (255, 0, 255)".to_string()]
        );
    }

    #[test]
    fn save_without_source_path_needs_save_as() {
        let mut s = session();
        assert!(matches!(s.save_image(), Err(EditError::InvalidState(_))));
    }

    #[test]
    fn stale_ticket_is_rejected() {
        let mut s = session();
        let (ticket, work) = s.prepare(Command::Apply(Filter::contrast(20))).unwrap();
        s.apply_color_filter(1, 1, 1).unwrap();
        let current = s.current().unwrap().clone();
        let outcome = work.run().unwrap();
        assert!(matches!(s.commit(ticket, outcome), Err(EditError::StaleResult)));
        assert_eq!(s.current().unwrap(), &current);
        assert_eq!(s.history().len(), 1);
    }

    #[test]
    fn reopening_resets_history() {
        let mut s = session();
        s.apply_contrast_filter(20).unwrap();
        assert!(s.is_dirty());
        s.open_buffer(PixelBuffer::new(3, 3), None);
        assert!(s.history().is_empty());
        assert!(!s.is_dirty());
        assert_eq!(s.current().unwrap().dimensions(), (3, 3));
    }

    #[test]
    fn prepare_does_not_mutate() {
        let s = session();
        let version = s.history().version();
        let _ = s.prepare(Command::Apply(Filter::contrast(20))).unwrap();
        assert_eq!(s.history().version(), version);
        assert!(s.history().is_empty());
    }
}
