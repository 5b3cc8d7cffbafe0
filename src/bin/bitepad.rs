//! bitepad - keyboard trigger pad for the mixer
//!
//! Run with: cargo run --bin bitepad -- kick.wav snare.wav splash.wav
//!
//! Number keys trigger the clips in argument order, `+`/`-` step the volume,
//! `q` or Esc quits.

use color_eyre::eyre::{eyre, Result as EyreResult};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::io::Write;

use bitemix::{io::wave, Clip, Mixer, MixerConfig};

/// Volume step per keypress, matching the coarse up/down most remotes use.
const VOLUME_STEP: i32 = 5;

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    env_logger::init();

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        return Err(eyre!("usage: bitepad <clip.wav> [<clip.wav> ...]"));
    }
    if paths.len() > 9 {
        return Err(eyre!("at most 9 clips fit on the number keys"));
    }

    let clips: Vec<Clip> = paths
        .iter()
        .map(|path| wave::load(path).map_err(|err| eyre!("{path}: {err}")))
        .collect::<EyreResult<_>>()?;

    let mixer = Mixer::open(MixerConfig::default())?;

    println!("=== bitepad ===");
    for (i, (path, clip)) in paths.iter().zip(&clips).enumerate() {
        println!("  [{}] {path} ({:.2}s)", i + 1, clip.duration().as_secs_f32());
    }
    println!("keys: 1-{} trigger, +/- volume, q quits", clips.len());
    println!();

    terminal::enable_raw_mode()?;
    let result = pad_loop(&mixer, &clips);
    terminal::disable_raw_mode()?;
    println!();

    result?;
    mixer.shutdown()?;
    Ok(())
}

fn pad_loop(mixer: &Mixer, clips: &[Clip]) -> EyreResult<()> {
    loop {
        if !mixer.is_healthy() {
            return Err(eyre!("the output device died; see the log"));
        }

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(());
            }
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                if let Some(clip) = clips.get(index) {
                    if mixer.enqueue(clip).is_err() {
                        status(mixer, "pad full, clip dropped")?;
                        continue;
                    }
                }
                status(mixer, "")?;
            }
            KeyCode::Char('+') | KeyCode::Char('=') => {
                step_volume(mixer, VOLUME_STEP);
                status(mixer, "")?;
            }
            KeyCode::Char('-') => {
                step_volume(mixer, -VOLUME_STEP);
                status(mixer, "")?;
            }
            _ => {}
        }
    }
}

fn step_volume(mixer: &Mixer, delta: i32) {
    let next = (mixer.volume() + delta).clamp(0, 100);
    // Clamped into range, so this cannot be rejected.
    mixer.set_volume(next).ok();
}

fn status(mixer: &Mixer, note: &str) -> EyreResult<()> {
    let mut out = std::io::stdout();
    write!(
        out,
        "\rvol {:3}%  playing {:2}  {note:<24}",
        mixer.volume(),
        mixer.active_clips()
    )?;
    out.flush()?;
    Ok(())
}
