//! Longest common subsequence of two key sequences
//!
//! Myers' O(ND) greedy search for the shortest edit script. The furthest
//! reaching x of every diagonal is kept for each edit distance `d`, then the
//! path is walked back and its diagonal runs ("snakes") collected.
//!
//! Only the diagonals `-d..=d+1` are kept per step, so the trace is
//! O(D^2) rather than O(D(N+M)).

use docsim_core::{Error, HashKey, Result};

/// Longest common subsequence of `a` and `b`.
///
/// # Errors
///
/// `InvariantViolation` if the search ends without reaching both ends,
/// which cannot happen for well-formed input.
///
/// # Example
///
/// ```
/// use docsim_markup::longest_common_subsequence;
///
/// let lcs = longest_common_subsequence(&[1, 2, 3, 4], &[2, 9, 3, 4]).unwrap();
/// assert_eq!(lcs, vec![2, 3, 4]);
/// ```
pub fn longest_common_subsequence(a: &[HashKey], b: &[HashKey]) -> Result<Vec<HashKey>> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let max = n + m;
    if max == 0 {
        return Ok(Vec::new());
    }
    let off = max;
    let mut v = vec![0isize; (2 * max + 2) as usize];
    let mut trace: Vec<Vec<isize>> = Vec::new();

    for d in 0..=max {
        trace.push(v[(off - d) as usize..=(off + d + 1) as usize].to_vec());
        let mut k = -d;
        while k <= d {
            let i = (k + off) as usize;
            let mut x = if k == -d || (k != d && v[i - 1] < v[i + 1]) {
                v[i + 1]
            } else {
                v[i - 1] + 1
            };
            let mut y = x - k;
            while x < n && y < m && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            v[i] = x;
            if x >= n && y >= m {
                return Ok(backtrack(&trace, a, x, y));
            }
            k += 2;
        }
    }
    Err(Error::invariant(format!(
        "no edit path found for sequences of {} and {} keys",
        n, m
    )))
}

/// Walk from the end point back to the origin, collecting snake keys.
fn backtrack(trace: &[Vec<isize>], a: &[HashKey], mut x: isize, mut y: isize) -> Vec<HashKey> {
    let mut common = Vec::new();
    for (d, v) in trace.iter().enumerate().rev() {
        let d = d as isize;
        let at = |k: isize| v[(k + d) as usize];
        let k = x - y;
        let prev_k = if k == -d || (k != d && at(k - 1) < at(k + 1)) {
            k + 1
        } else {
            k - 1
        };
        let prev_x = at(prev_k);
        let prev_y = prev_x - prev_k;
        while x > prev_x && y > prev_y {
            x -= 1;
            y -= 1;
            common.push(a[x as usize]);
        }
        if d > 0 {
            x = prev_x;
            y = prev_y;
        }
    }
    common.reverse();
    common
}
