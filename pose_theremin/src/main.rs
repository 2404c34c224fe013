//! pose_theremin — interactive entry point.

use pose_notes::NoteTable;
use pose_stream::PartName;
use pose_theremin::app::{run, AppConfig, SourceKind};
use std::io::{self, Write};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return;
    }

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║         Pose Theremin — wrist-height note controller         ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    let source = match args.iter().position(|a| a == "--listen") {
        Some(i) => match args.get(i + 1) {
            Some(addr) => SourceKind::Udp { addr: addr.clone() },
            None => {
                eprintln!("Error: --listen needs a bind address, e.g. --listen 0.0.0.0:9900");
                std::process::exit(2);
            }
        },
        None => SourceKind::Sim,
    };
    match &source {
        SourceKind::Sim => {
            println!("  Source: Simulated wrist sweep  (use --listen <addr> for a live detector)")
        }
        SourceKind::Udp { addr } => println!("  Source: UDP pose detector on {}", addr),
    }
    println!();

    let cfg = if args.iter().any(|a| a == "--quick") {
        println!("  Quick-start: hexachord C4–A4, right wrist, square lead\n");
        AppConfig { source, ..AppConfig::default() }
    } else {
        configure_interactively(source)
    };

    println!("  Controls: Enter/m = sound on/off   q = quit   (starts muted)");
    println!();

    if let Err(e) = run(cfg) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn configure_interactively(source: SourceKind) -> AppConfig {
    let table = pick_table();
    let part  = pick_part();

    let threshold: f32 = {
        let t: f32 = read_line("  Confidence threshold 0–0.95 (default 0.2): ")
            .trim().parse().unwrap_or(0.2);
        t.max(0.0).min(0.95)
    };

    let frame_height: f32 = match &source {
        SourceKind::Udp { .. } => read_line("  Detector frame height px (default 480): ")
            .trim().parse::<f32>().unwrap_or(480.0).max(1.0),
        SourceKind::Sim => 480.0,
    };

    let program = pick_instrument();

    AppConfig {
        table,
        part,
        threshold,
        frame_height,
        source,
        program,
        ..AppConfig::default()
    }
}

fn pick_table() -> NoteTable {
    println!("  Note table: 1=Hexachord C4–A4  2=Major scale  3=Minor pentatonic");
    match read_line("  Choice (default 1): ").trim() {
        "2" => NoteTable::major(read_root(), read_count()),
        "3" => NoteTable::minor_pentatonic(read_root(), read_count()),
        _   => NoteTable::default(),
    }
}

fn read_root() -> u8 {
    read_line("  Root note MIDI# (default 60 = C4): ")
        .trim().parse::<u8>().unwrap_or(60).min(127)
}

fn read_count() -> usize {
    read_line("  Notes in the table (default 8): ")
        .trim().parse::<usize>().unwrap_or(8).max(1).min(24)
}

fn pick_part() -> PartName {
    println!("  Tracked wrist: 1=Right  2=Left");
    match read_line("  Choice (default 1): ").trim() {
        "2" => PartName::LeftWrist,
        _   => PartName::RightWrist,
    }
}

fn pick_instrument() -> u8 {
    println!("  Instrument (GM program 0–127):");
    println!("    80=Lead Square  81=Lead Saw  78=Whistle  73=Flute");
    println!("    54=Synth Voice  88=Pad New Age  40=Violin  0=Grand Piano");
    read_line("  Program (default 80): ").trim().parse::<u8>().unwrap_or(80).min(127)
}

fn print_help() {
    println!("pose_theremin — wrist-height note controller");
    println!();
    println!("USAGE:");
    println!("    pose_theremin [--quick] [--listen <addr>]");
    println!();
    println!("OPTIONS:");
    println!("    --quick           Skip the interactive setup (hexachord, right wrist)");
    println!("    --listen <addr>   Read pose datagrams over UDP instead of simulating");
    println!("    -h, --help        Show this help");
    println!();
    println!("Datagram format, one keypoint per line: partName x y score");
    println!("Set RUST_LOG=debug for per-change diagnostics.");
}

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    io::stdout().flush().ok();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_line_keeps_the_prompt_signature() {
        // Every interactive prompt funnels through this one helper.
        let _: fn(&str) -> String = read_line;
    }

    #[test]
    fn blank_prompt_lines_fall_back_to_defaults() {
        // A bare Enter comes back from read_line as "\n"; each prompt's
        // trim-then-parse chain must land on its documented default.
        let entered = "\n";
        assert_eq!(entered.trim().parse::<u8>().unwrap_or(80).min(127), 80);
        assert_eq!(entered.trim().parse::<u8>().unwrap_or(60).min(127), 60);
        assert_eq!(entered.trim().parse::<usize>().unwrap_or(8).max(1).min(24), 8);
        assert_eq!(entered.trim().parse::<f32>().unwrap_or(0.2).max(0.0).min(0.95), 0.2);
    }
}
