use crate::clock::Clock;
use core::fmt::Arguments;
use goolog::log::{set_max_level, Level, LevelFilter};
use goolog::{init_logger, LoggerAlreadySet};
use yansi::{Color, Paint};

pub fn print_log(target: &str, level: Level, args: &Arguments) {
    let color = match level {
        Level::Error => Color::Red,
        Level::Warn => Color::Yellow,
        Level::Info => Color::Green,
        Level::Debug => Color::Blue,
        Level::Trace => Color::Black,
    };
    let timestamp = Clock::format();
    println!("[{} | {} | {}] {}", timestamp, level.white().bg(color), target, args);
}

/// Route `goolog` output through [`print_log`]. Fails if a logger is
/// already installed.
pub fn init(max_level: LevelFilter) -> Result<(), LoggerAlreadySet> {
    init_logger(
        Some(Level::Trace),
        None,
        &|_timestamp, target, level, args| print_log(target, level, args),
    )?;

    set_max_level(max_level);
    Ok(())
}
