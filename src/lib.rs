pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod gtfs;
pub mod linker;
pub mod lines;
pub mod pipeline;
pub mod table;
pub mod timetable;
