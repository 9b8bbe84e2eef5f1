//! Keystroke timing for typed notes and messages.
//!
//! Produces a sequence the actuator replays key by key: per-key delays in
//! the configured typing range, occasional typos on a neighbouring QWERTY key
//! followed by a correcting backspace, and short pauses between bursts of
//! three to eight characters.

use rand::{seq::SliceRandom, Rng};

use cadence_contracts::{config::StealthConfig, profile::Keystroke};

use crate::distributions::{chance, uniform_ms};

/// Neighbouring keys on a QWERTY layout, used to pick plausible typos.
fn adjacent_keys(c: char) -> &'static [char] {
    match c {
        'a' => &['s', 'q', 'w', 'z'],
        'b' => &['v', 'n', 'g', 'h'],
        'c' => &['x', 'v', 'd', 'f'],
        'd' => &['s', 'f', 'e', 'r', 'c', 'x'],
        'e' => &['w', 'r', 'd', 's'],
        'f' => &['d', 'g', 'r', 't', 'v', 'c'],
        'g' => &['f', 'h', 't', 'y', 'b', 'v'],
        'h' => &['g', 'j', 'y', 'u', 'n', 'b'],
        'i' => &['u', 'o', 'k', 'j'],
        'j' => &['h', 'k', 'u', 'i', 'm', 'n'],
        'k' => &['j', 'l', 'i', 'o', 'm'],
        'l' => &['k', 'o', 'p'],
        'm' => &['n', 'j', 'k'],
        'n' => &['b', 'm', 'h', 'j'],
        'o' => &['i', 'p', 'k', 'l'],
        'p' => &['o', 'l'],
        'q' => &['w', 'a'],
        'r' => &['e', 't', 'd', 'f'],
        's' => &['a', 'd', 'w', 'e', 'x', 'z'],
        't' => &['r', 'y', 'f', 'g'],
        'u' => &['y', 'i', 'h', 'j'],
        'v' => &['c', 'b', 'f', 'g'],
        'w' => &['q', 'e', 'a', 's'],
        'x' => &['z', 'c', 's', 'd'],
        'y' => &['t', 'u', 'g', 'h'],
        'z' => &['a', 's', 'x'],
        _ => &[],
    }
}

fn burst_target<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    rng.gen_range(3..=8)
}

/// Build the keystroke sequence for `text`.
///
/// Every character of `text` appears exactly once as a non-typo keystroke,
/// in order, so replaying the sequence (applying backspaces) yields `text`.
pub fn typing_profile<R: Rng + ?Sized>(rng: &mut R, text: &str, stealth: &StealthConfig) -> Vec<Keystroke> {
    let chars: Vec<char> = text.chars().collect();
    let mut sequence = Vec::with_capacity(chars.len() + chars.len() / 8);
    let mut burst_count = 0;
    let mut target = burst_target(rng);
    let mut carry_pause = 0;

    for (i, &c) in chars.iter().enumerate() {
        let neighbours = adjacent_keys(c.to_ascii_lowercase());
        if !neighbours.is_empty() && chance(rng, stealth.typo_probability) {
            if let Some(&wrong) = neighbours.choose(rng) {
                let wrong = if c.is_uppercase() { wrong.to_ascii_uppercase() } else { wrong };
                sequence.push(Keystroke {
                    key: Some(wrong),
                    delay_ms: key_delay(rng, stealth) + std::mem::take(&mut carry_pause),
                    is_typo: true,
                });
                // Noticing the mistake, then the backspace itself.
                sequence.push(Keystroke {
                    key: None,
                    delay_ms: uniform_ms(rng, 200, 500) + uniform_ms(rng, 50, 100),
                    is_typo: false,
                });
            }
        }

        let mut delay = key_delay(rng, stealth) + std::mem::take(&mut carry_pause);
        if c.is_uppercase() {
            delay += uniform_ms(rng, 30, 80);
        }
        if i > 0 {
            match chars[i - 1] {
                '.' | '!' | '?' => delay += uniform_ms(rng, 100, 300),
                ' ' if chance(rng, 0.3) => delay += uniform_ms(rng, 50, 150),
                _ => {}
            }
        }
        sequence.push(Keystroke {
            key: Some(c),
            delay_ms: delay,
            is_typo: false,
        });

        burst_count += 1;
        if burst_count >= target {
            carry_pause = uniform_ms(rng, 100, 300);
            burst_count = 0;
            target = burst_target(rng);
        }
    }

    sequence
}

fn key_delay<R: Rng + ?Sized>(rng: &mut R, stealth: &StealthConfig) -> u64 {
    uniform_ms(rng, stealth.typing_min_delay_ms, stealth.typing_max_delay_ms)
}

/// Replay a keystroke sequence into the text it produces.
pub fn replay(sequence: &[Keystroke]) -> String {
    let mut out = String::new();
    for stroke in sequence {
        match stroke.key {
            Some(c) => out.push(c),
            None => {
                out.pop();
            }
        }
    }
    out
}
