use log::debug;
use std::time::Duration;
use trice::Instant;

macro_rules! impl_total_size_static {
    ( $($t:ty),+ $(,)? ) => {
        $( impl $crate::TotalSize for $t {
            #[inline]
            fn static_size() -> Option<usize> {
                Some(std::mem::size_of::<Self>())
            }
            #[inline]
            fn total_size(&self) -> usize {
                std::mem::size_of::<Self>()
            }
        })+
    }
}

/// Logs the elapsed time of a scope (at `debug` level) when dropped.
pub(crate) struct Timer {
    file: &'static str,
    line: u32,
    label: &'static str,
    start: Instant,
}

impl Timer {
    pub fn new(file: &'static str, line: u32, label: &'static str) -> Self {
        Self {
            file,
            line,
            label,
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        debug!(
            "[{}:{}] {}: time elapsed {:?}",
            self.file,
            self.line,
            self.label,
            self.elapsed(),
        );
    }
}

macro_rules! time {
    ($label:expr, $b:block) => {{
        let _timer = $crate::macros::Timer::new(::std::file!(), ::std::line!(), $label);
        $b
    }};
    ($label:expr, $e:expr) => {{
        time!($label, { $e })
    }};
}
