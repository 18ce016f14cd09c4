/// Render layer drawn only by the outline id camera.
pub const ID_LAYER: usize = 2;

/// Render layer used by the inspection overlay camera.
pub const INSPECT_LAYER: usize = 3;

/// Id layer of the inspection overlay, kept apart from the room's id buffer.
pub const INSPECT_ID_LAYER: usize = 4;

/// Minimum divergence (1 - dot) between neighbouring normals that counts as an edge.
pub const OUTLINE_NORMAL_THRESHOLD: f32 = 0.35;

/// Per-channel difference between neighbouring id samples that counts as an edge.
/// Ids are stored in 8-bit alpha so anything above half a step is a real change.
pub const OUTLINE_ID_THRESHOLD: f32 = 0.5 / 255.0;

/// Neighbourhood sampling distance in pixels.
pub const OUTLINE_THICKNESS_PX: f32 = 1.0;

/// Default ink colour for objects without a configured outline.
pub const DEFAULT_OUTLINE_RGB: [f32; 3] = [0.06, 0.05, 0.04];

/// Pixel cell size when the inspection overlay is fully open.
pub const INSPECT_PIXELATE_CELL_PX: f32 = 6.0;

/// Rate at which the pixelation strength follows the inspection state.
pub const INSPECT_PIXELATE_DAMPING: f32 = 9.0;

/// Lens mask radius in normalised device units (vertical axis).
pub const LENS_RADIUS: f32 = 0.47;

/// Seconds between perf snapshot publications.
pub const PERF_PUBLISH_INTERVAL_SECS: f32 = 0.5;

/// Rolling window of frame samples kept for the perf snapshot.
pub const PERF_SAMPLE_WINDOW: usize = 240;
