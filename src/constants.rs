//! Global constants shared by the parser, arbiter, and renderer.

/// The total width of the OLED display in pixels.
pub const DISPLAY_WIDTH: u32 = 128;
/// The total height of the OLED display in pixels.
pub const DISPLAY_HEIGHT: u32 = 64;

/// Default path of the shairport-sync metadata FIFO.
pub const DEFAULT_METADATA_PIPE: &str = "/tmp/shairport-sync-metadata";
/// Default path of moOde's currentsong status file.
pub const DEFAULT_CURRENTSONG: &str = "/var/local/www/currentsong.txt";

/// Default I2C bus device for the display.
pub const DEFAULT_I2C_BUS: &str = "/dev/i2c-1";
/// Default I2C address of the SH1106 controller.
pub const DEFAULT_I2C_ADDRESS: u8 = 0x3C;
/// Panels in the stock moOde case mount upside down.
pub const DEFAULT_ROTATE_DEG: u16 = 180;

/// Frame start marker in the metadata stream. Seeing one always resets
/// the frame accumulator, dropping any incomplete prior frame.
pub const FRAME_START: &str = "<item>";
/// Frame close marker; once the accumulator contains it the frame is complete.
pub const FRAME_CLOSE: &str = "</data>";

/// Arbiter period between status-file evaluations.
pub const STATUS_TICK_MS: u64 = 300;

/// Horizontal scroll advance per animation frame, in pixels.
pub const SCROLL_STEP_PX: i32 = 4;
/// Sleep between scroll frames.
pub const SCROLL_FRAME_MS: u64 = 25;
/// Hold duration at the start of each scroll pass.
pub const SCROLL_HOLD_MS: u64 = 2000;
/// Backoff before reopening the metadata pipe after EOF or an I/O error.
pub const PIPE_REOPEN_MS: u64 = 250;

/// Primary line shown while idle and at startup.
pub const IDLE_PRIMARY: &str = "moOde";
/// Secondary line shown while the player is asleep.
pub const IDLE_SECONDARY: &str = "sleeping...";
/// Secondary line shown at startup before any source has reported.
pub const LOADING_SECONDARY: &str = "Loading...";
