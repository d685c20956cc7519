//! Short beeps on start, pause and a full bucket.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cue {
    Start,
    Pause,
    BucketFull,
}

impl Cue {
    /// (frequency Hz, duration ms) per beep
    fn tones(self) -> &'static [(u32, u32)] {
        match self {
            Cue::Start => &[(880, 120), (1320, 120)],
            Cue::Pause => &[(1320, 120), (880, 120)],
            Cue::BucketFull => &[(660, 200), (660, 200), (660, 200)],
        }
    }

    /// Plays the cue on a background thread.
    pub fn play(self) {
        let tones = self.tones();
        std::thread::spawn(move || {
            for &(frequency, duration) in tones {
                beep(frequency, duration);
            }
        });
    }
}

#[cfg(windows)]
fn beep(frequency: u32, duration: u32) {
    use windows::Win32::System::Diagnostics::Debug::Beep;
    if let Err(e) = unsafe { Beep(frequency, duration) } {
        log::debug!("Beep failed: {}", e);
    }
}

#[cfg(not(windows))]
fn beep(_frequency: u32, _duration: u32) {}
