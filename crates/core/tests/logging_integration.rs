//! Global logging configuration as seen by the memory model.

use mos6502_core::logging::{LogCategory, LogConfig, LogLevel};
use mos6502_core::{Memory, Memory6502};
use std::fs;
use std::thread::sleep;
use std::time::Duration;

#[test]
fn test_stack_and_loader_messages_reach_log_file() {
    let path = std::env::temp_dir().join(format!("mos6502-log-{}.txt", std::process::id()));
    let _ = fs::remove_file(&path);

    let config = LogConfig::global();
    config.set_level(LogCategory::Stack, LogLevel::Trace);
    config.set_level(LogCategory::Loader, LogLevel::Info);
    config.set_log_file(path.clone()).expect("open log file");

    let mut mem = Memory::new();
    let mut sp = 0x00;
    mem.stack_push_byte(&mut sp, 0x01);
    mem.load_program(0x8000, &[0xEA]).expect("load");
    assert!(mem.load_program(0xFFFF, &[0xEA, 0xEA]).is_err());

    // the writer thread drains the channel after the sender goes away
    config.clear_log_file();
    let mut contents = String::new();
    for _ in 0..50 {
        contents = fs::read_to_string(&path).unwrap_or_default();
        if contents.lines().count() >= 3 {
            break;
        }
        sleep(Duration::from_millis(20));
    }
    config.set_level(LogCategory::Stack, LogLevel::Off);
    config.set_level(LogCategory::Loader, LogLevel::Off);
    let _ = fs::remove_file(&path);

    assert!(contents.contains("[STACK] stack pointer wrapped $00 -> $FF on push"));
    assert!(contents.contains("[LOADER] loaded 1 bytes at $8000-$8000"));
    assert!(contents.contains("[LOADER] rejected 2 byte image at $FFFF"));
}

#[test]
fn test_environment_overrides() {
    let config = LogConfig::global();
    let rejected = config.apply_vars(|key| match key {
        "EMU_LOG_MEMORY" => Some("debug".to_string()),
        "EMU_LOG_STATE" => Some("nonsense".to_string()),
        _ => None,
    });
    assert_eq!(config.get_level(LogCategory::Memory), LogLevel::Debug);
    assert_eq!(rejected, vec!["EMU_LOG_STATE".to_string()]);
    config.set_level(LogCategory::Memory, LogLevel::Off);
}
