//! Table detection from ruled lines.

pub mod boundary;
pub mod columns;
pub mod contour;
pub mod detector;

pub use boundary::TableBoundaryResolver;
pub use columns::column_separators;
pub use contour::ContourTableFinder;
pub use detector::LineDetector;
