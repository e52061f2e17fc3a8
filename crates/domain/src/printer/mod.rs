mod connection_state;
mod device;
mod operation;
mod series;
mod status;
mod target;

pub use connection_state::ConnectionState;
pub use device::{
    CallbackCode, PrinterDevice, PrinterDeviceFactory, ReceiveEvent, ReceiveListener,
};
pub use operation::{
    Alignment, Bitmap, CutMode, Font, Halftone, ImageBlock, ImageMode, PrintOperation, TextSize,
    TextStyle,
};
pub use series::PrinterSeries;
pub use status::{
    ErrorStatus, PaperState, PrinterStatusSnapshot, StatusFlag, StatusReport, is_printable,
};
pub use target::PrinterTarget;
