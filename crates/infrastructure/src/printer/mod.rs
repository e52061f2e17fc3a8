mod simulated_printer;

pub use simulated_printer::{
    FaultPoint, SimulatedCommand, SimulatedPrinter, SimulatedPrinterFactory, SimulatorHandle,
};
