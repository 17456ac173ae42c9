use std::time::{Duration, Instant};

/// Floor for the inter-attempt sleep, so a slow attempt never turns the
/// loop into a busy spin.
const MIN_SLEEP: Duration = Duration::from_millis(10);

/// Drive `attempt` at `scan_rate` attempts per second until it reports
/// success or `timeout` seconds elapse. The deadline is fixed on entry.
///
/// A timeout shorter than one scan period means exactly one attempt and
/// no sleep at all, so `timeout == 0.0` is a cheap single-shot probe.
/// Errors from `attempt` abort the loop immediately.
pub fn repeat<E>(
    timeout: f64,
    scan_rate: f32,
    mut attempt: impl FnMut() -> Result<bool, E>,
) -> Result<bool, E> {
    let period = Duration::from_secs_f64(1.0 / f64::from(scan_rate.max(0.01)));
    let deadline = Instant::now() + Duration::from_secs_f64(timeout.max(0.0));

    loop {
        let started = Instant::now();
        if attempt()? {
            return Ok(true);
        }
        if timeout < period.as_secs_f64() {
            return Ok(false);
        }
        let elapsed = started.elapsed();
        let sleep = period.checked_sub(elapsed).unwrap_or(MIN_SLEEP).max(MIN_SLEEP);
        std::thread::sleep(sleep);
        if Instant::now() >= deadline {
            return Ok(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timeout_makes_exactly_one_attempt_without_sleeping() {
        let mut calls = 0;
        let start = Instant::now();
        let out: Result<bool, ()> = repeat(0.0, 3.0, || {
            calls += 1;
            Ok(false)
        });
        assert_eq!(out, Ok(false));
        assert_eq!(calls, 1);
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn immediate_success_is_a_single_attempt() {
        let mut calls = 0;
        let out: Result<bool, ()> = repeat(5.0, 3.0, || {
            calls += 1;
            Ok(true)
        });
        assert_eq!(out, Ok(true));
        assert_eq!(calls, 1);
    }

    #[test]
    fn retries_until_success_within_the_deadline() {
        let mut calls = 0;
        let out: Result<bool, ()> = repeat(5.0, 20.0, || {
            calls += 1;
            Ok(calls == 3)
        });
        assert_eq!(out, Ok(true));
        assert_eq!(calls, 3);
    }

    #[test]
    fn gives_up_at_the_deadline() {
        let start = Instant::now();
        let out: Result<bool, ()> = repeat(0.3, 10.0, || Ok(false));
        assert_eq!(out, Ok(false));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(280), "gave up too early: {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(2));
    }

    #[test]
    fn errors_abort_immediately() {
        let mut calls = 0;
        let out = repeat(5.0, 3.0, || {
            calls += 1;
            Err("boom")
        });
        assert_eq!(out, Err("boom"));
        assert_eq!(calls, 1);
    }
}
