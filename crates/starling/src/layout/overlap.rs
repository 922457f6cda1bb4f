//! Pairwise overlap removal over node rects.

use crate::config::OverlapConfig;
use crate::geom::Rect;

/// Runs `config.passes` overlap-removal passes over `rects` in slice order.
///
/// Every pass sweeps all pairs and pushes overlapping ones apart along their axis of least
/// overlap, splitting the move between both rects unless one of them is fixed. A pass repeats
/// its sweep until one comes back clean or `sweeps_per_pass` is reached. Returns the number of
/// pair resolutions performed; zero means the input was already overlap-free.
pub fn remove_overlaps(rects: &mut [Rect], config: &OverlapConfig) -> usize {
    let mut resolved = 0;
    for _ in 0..config.passes {
        resolved += run_pass(rects, config);
    }
    resolved
}

fn run_pass(rects: &mut [Rect], config: &OverlapConfig) -> usize {
    let mut resolved = 0;
    for _ in 0..config.sweeps_per_pass {
        let n = sweep(rects, config.padding);
        if n == 0 {
            break;
        }
        resolved += n;
    }
    resolved
}

fn sweep(rects: &mut [Rect], padding: f64) -> usize {
    let mut resolved = 0;
    for j in 1..rects.len() {
        let (head, tail) = rects.split_at_mut(j);
        let b = &mut tail[0];
        for a in head.iter_mut() {
            if a.fixed && b.fixed {
                continue;
            }
            let Some(v) = a.min_translation(b, padding) else {
                continue;
            };
            match (a.fixed, b.fixed) {
                (true, _) => b.move_by(-v),
                (_, true) => a.move_by(v),
                _ => {
                    a.move_by(v / 2.0);
                    b.move_by(-v / 2.0);
                }
            }
            resolved += 1;
        }
    }
    resolved
}
