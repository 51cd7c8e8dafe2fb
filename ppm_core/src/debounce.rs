//! Settle-and-reread debouncing for a single push button.

/// Result of feeding one raw reading to a [`Debouncer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Edge {
    #[default]
    NoChange,
    RoseToActive,
    FellToInactive,
}

impl Edge {
    #[inline]
    pub const fn is_press(self) -> bool {
        matches!(self, Self::RoseToActive)
    }
}

/// Tracks the last settled level of one input line.
///
/// When a raw reading differs from the stored level the caller-provided
/// `settle` closure runs once: it waits out the bounce and re-reads the line.
/// The settled level is authoritative. Each button owns its own instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct Debouncer {
    level: bool,
}

impl Debouncer {
    pub const fn new(initial: bool) -> Self {
        Self { level: initial }
    }

    /// Last settled level.
    #[inline]
    pub const fn level(&self) -> bool {
        self.level
    }

    /// Feed one raw reading. `settle` runs only when `raw` differs from the
    /// stored level; its result becomes the new level.
    ///
    /// Use this when the re-read cannot fail (simulations, tests, GPIO
    /// backends that never error); the controller uses
    /// [`try_update`](Self::try_update) so device errors propagate.
    pub fn update(&mut self, raw: bool, settle: impl FnOnce() -> bool) -> Edge {
        match self.try_update(raw, || Ok::<_, std::convert::Infallible>(settle())) {
            Ok(edge) => edge,
            Err(never) => match never {},
        }
    }

    /// Like [`update`](Self::update) for a re-read that can fail. On error the
    /// stored level is left untouched.
    pub fn try_update<E>(
        &mut self,
        raw: bool,
        settle: impl FnOnce() -> Result<bool, E>,
    ) -> Result<Edge, E> {
        if raw == self.level {
            return Ok(Edge::NoChange);
        }
        let settled = settle()?;
        if settled == self.level {
            tracing::trace!(raw, settled, "button glitch ignored");
            return Ok(Edge::NoChange);
        }
        self.level = settled;
        let edge = if settled {
            Edge::RoseToActive
        } else {
            Edge::FellToInactive
        };
        tracing::trace!(?edge, "button edge");
        Ok(edge)
    }
}
