//! Per-test scopes owning a virtual clock and its deferred assertions
//!
//! A scope moves through `Created → Active → Ending → Disposed` exactly once.
//! Assertions can only be registered while it is active; ending it advances
//! its clock to the furthest horizon any registration asked for, runs every
//! pending assertion, and pops it from this thread's scope stack.
//!
//! Scopes nest. Each has its own clock and assertion list, and ending the
//! innermost scope never touches the ones around it.

use crate::assertions::{
    assert_events, assert_side_effects, collect_mismatches, StructuralEq, ValueComparer,
};
use crate::domain::diagram::{MarbleDiagram, SideEffectEvent};
use crate::domain::notification::{Recorded, TimedEvent};
use crate::domain::defaults;
use crate::domain::types::{ScopeId, TimeGrid, UnitOfTime, VirtualTime};
use crate::error::{Error, Result};
use crate::infrastructure::log_messages;
use crate::scheduler::recorder::{Recorder, SideEffectProbe};
use crate::scheduler::sequence::Observable;
use crate::scheduler::sources::TestableObservable;
use crate::scheduler::VirtualScheduler;
use derive_more::Display;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;
use tracing::{debug, error, warn};

/// Timing knobs for one scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeOptions {
    /// Ticks per diagram frame
    pub unit_of_time: UnitOfTime,
    /// Grid both timelines are truncated to before comparison
    pub time_grid: TimeGrid,
    /// How long an expectation keeps observing past its last expected event
    pub expectation_padding: VirtualTime,
}

impl ScopeOptions {
    pub fn with_unit_of_time(self, unit_of_time: UnitOfTime) -> Self {
        Self {
            unit_of_time,
            ..self
        }
    }

    pub fn with_time_grid(self, time_grid: TimeGrid) -> Self {
        Self { time_grid, ..self }
    }
}

impl Default for ScopeOptions {
    fn default() -> Self {
        Self {
            unit_of_time: UnitOfTime::default(),
            time_grid: TimeGrid::default(),
            expectation_padding: VirtualTime::new(defaults::scheduler::EXPECTATION_PADDING_TICKS),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ScopePhase {
    #[display("created")]
    Created,
    #[display("active")]
    Active,
    #[display("ending")]
    Ending,
    #[display("disposed")]
    Disposed,
}

type Assertion = Box<dyn FnOnce() -> Result<()>>;

pub struct TestScope {
    id: ScopeId,
    options: ScopeOptions,
    scheduler: VirtualScheduler,
    phase: Cell<ScopePhase>,
    horizon: Cell<VirtualTime>,
    assertions: RefCell<Vec<Assertion>>,
}

impl TestScope {
    fn new(id: ScopeId, options: ScopeOptions) -> Self {
        Self {
            id,
            options,
            scheduler: VirtualScheduler::new(),
            phase: Cell::new(ScopePhase::Created),
            horizon: Cell::new(VirtualTime::zero()),
            assertions: RefCell::new(Vec::new()),
        }
    }

    fn ensure_accepting(&self) -> Result<()> {
        match self.phase.get() {
            ScopePhase::Created | ScopePhase::Active => Ok(()),
            ScopePhase::Ending | ScopePhase::Disposed => Err(Error::ScopeClosed(self.id)),
        }
    }

    fn extend_horizon(&self, until: VirtualTime) {
        self.horizon.set(self.horizon.get().max(until));
    }

    /// Drive the clock and run every assertion; the first failure wins
    fn run_assertions(&self) -> Result<()> {
        self.phase.set(ScopePhase::Ending);
        let horizon = self.horizon.get();
        debug!(scope = %self.id, %horizon, "{}", log_messages::scope::RUNNING_ASSERTIONS);

        self.scheduler.advance_to(horizon);

        let assertions = std::mem::take(&mut *self.assertions.borrow_mut());
        let total = assertions.len();
        let mut first_failure = None;
        let mut failures = 0usize;

        for (index, assertion) in assertions.into_iter().enumerate() {
            if let Err(failure) = assertion() {
                failures += 1;
                warn!(scope = %self.id, assertion = index, error = %failure, "{}", log_messages::scope::ASSERTION_FAILED);
                first_failure.get_or_insert(failure);
            }
        }

        self.phase.set(ScopePhase::Disposed);

        match first_failure {
            Some(failure) => {
                error!(scope = %self.id, failures, total, "{}", log_messages::scope::ENDED_WITH_FAILURES);
                Err(failure)
            }
            None => {
                debug!(scope = %self.id, total, "{}", log_messages::scope::END);
                Ok(())
            }
        }
    }
}

impl fmt::Debug for TestScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestScope")
            .field("id", &self.id)
            .field("phase", &self.phase.get())
            .field("horizon", &self.horizon.get())
            .field("pending_assertions", &self.assertions.borrow().len())
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

/// Shared handle to a scope, used to build sources and register expectations
#[derive(Debug, Clone)]
pub struct ScopeHandle(Rc<TestScope>);

impl ScopeHandle {
    pub fn id(&self) -> ScopeId {
        self.0.id
    }

    pub fn options(&self) -> ScopeOptions {
        self.0.options
    }

    pub fn phase(&self) -> ScopePhase {
        self.0.phase.get()
    }

    /// The scope's clock
    pub fn scheduler(&self) -> VirtualScheduler {
        self.0.scheduler.clone()
    }

    pub fn now(&self) -> VirtualTime {
        self.0.scheduler.now()
    }

    pub fn pending_assertions(&self) -> usize {
        self.0.assertions.borrow().len()
    }

    /// A cold source replaying `diagram` from each subscription time
    pub fn cold<T, E>(&self, diagram: &MarbleDiagram<T, E>) -> TestableObservable<T, E>
    where
        T: Clone + 'static,
        E: Clone + 'static,
    {
        self.0
            .scheduler
            .create_cold(diagram.notifications(self.0.options.unit_of_time))
    }

    /// A hot source whose timeline starts at the scope's time zero
    pub fn hot<T, E>(&self, diagram: &MarbleDiagram<T, E>) -> TestableObservable<T, E>
    where
        T: Clone + 'static,
        E: Clone + 'static,
    {
        self.0
            .scheduler
            .create_hot(diagram.notifications(self.0.options.unit_of_time))
    }

    /// Queue an assertion to run when the scope ends, after the clock reaches `horizon`
    pub fn register_assertion(
        &self,
        horizon: VirtualTime,
        assertion: impl FnOnce() -> Result<()> + 'static,
    ) -> Result<()> {
        self.0.ensure_accepting()?;
        self.0.extend_horizon(horizon);
        self.0.assertions.borrow_mut().push(Box::new(assertion));
        debug!(scope = %self.0.id, %horizon, "{}", log_messages::scope::ASSERTION_REGISTERED);
        Ok(())
    }

    /// Expect `sequence` to behave like `diagram`, comparing values with `PartialEq`
    pub fn expect<T, E>(&self, sequence: &Observable<T, E>, diagram: &MarbleDiagram<T, E>) -> Result<()>
    where
        T: Clone + PartialEq + fmt::Debug + 'static,
        E: Clone + PartialEq + fmt::Debug + 'static,
    {
        self.expect_with(sequence, diagram, StructuralEq)
    }

    /// Expect `sequence` to behave like `diagram`, comparing values with `comparer`
    ///
    /// The sequence is subscribed right away; the diagram's timeline is read
    /// relative to the current virtual time. The subscription is released
    /// once the padding after the last expected event has elapsed.
    pub fn expect_with<T, E, C>(
        &self,
        sequence: &Observable<T, E>,
        diagram: &MarbleDiagram<T, E>,
        comparer: C,
    ) -> Result<()>
    where
        T: Clone + fmt::Debug + 'static,
        E: Clone + PartialEq + fmt::Debug + 'static,
        C: ValueComparer<T> + 'static,
    {
        self.0.ensure_accepting()?;

        let scope = &self.0;
        let offset = scope.scheduler.now();
        let expected: Vec<TimedEvent<T, E>> = diagram
            .notifications(scope.options.unit_of_time)
            .into_iter()
            .map(|event| Recorded::new(offset.saturating_add(event.time), event.value))
            .collect();
        let last = expected.last().map_or(offset, |event| event.time);
        let release_at = last.saturating_add(scope.options.expectation_padding);

        let recorder = Recorder::new(scope.scheduler.clone());
        let subscription = sequence.subscribe(recorder.observer());
        {
            let recorder = recorder.clone();
            scope.scheduler.schedule_at(release_at, move || {
                recorder.detach();
                subscription.dispose();
            });
        }

        let id = scope.id;
        let grid = scope.options.time_grid;
        let source = diagram.as_str().to_string();
        self.register_assertion(release_at, move || {
            let actual = recorder.messages();
            let outcome = assert_events(&actual, &expected, &comparer, grid);
            if outcome.as_ref().is_err_and(Error::is_assertion_failure) {
                log_mismatches(id, &source, &actual, &expected, &comparer, grid);
            }
            outcome
        })
    }

    /// Invoke the callables bound to `diagram`'s side-effect frames at their times
    pub fn schedule_side_effects<T, E>(&self, diagram: &MarbleDiagram<T, E>) -> Result<()>
    where
        T: Clone,
        E: Clone,
    {
        self.0.ensure_accepting()?;

        let scope = &self.0;
        let offset = scope.scheduler.now();
        let effects = diagram.side_effects(scope.options.unit_of_time);
        debug!(scope = %scope.id, count = effects.len(), "{}", log_messages::assertions::SIDE_EFFECTS_SCHEDULED);

        for effect in effects {
            let due = offset.saturating_add(effect.time);
            scope.extend_horizon(due);
            scope.scheduler.schedule_at(due, move || effect.value.invoke());
        }
        Ok(())
    }

    /// A probe stamping its invocations with this scope's clock
    pub fn probe(&self) -> SideEffectProbe {
        SideEffectProbe::new(self.0.scheduler.clone())
    }

    /// Expect `probe` to have been invoked exactly at `diagram`'s side-effect times
    pub fn expect_side_effects<T, E>(
        &self,
        probe: &SideEffectProbe,
        diagram: &MarbleDiagram<T, E>,
    ) -> Result<()>
    where
        T: Clone,
        E: Clone,
    {
        self.0.ensure_accepting()?;

        let scope = &self.0;
        let offset = scope.scheduler.now();
        let expected: Vec<SideEffectEvent> = diagram
            .side_effects(scope.options.unit_of_time)
            .into_iter()
            .map(|effect| Recorded::new(offset.saturating_add(effect.time), effect.value))
            .collect();
        let last = expected.last().map_or(offset, |effect| effect.time);
        let horizon = last.saturating_add(scope.options.expectation_padding);

        let probe = probe.clone();
        let grid = scope.options.time_grid;
        self.register_assertion(horizon, move || {
            assert_side_effects(&probe.invocations(), &expected, grid)
        })
    }
}

fn log_mismatches<T, E, C>(
    scope: ScopeId,
    diagram: &str,
    actual: &[TimedEvent<T, E>],
    expected: &[TimedEvent<T, E>],
    comparer: &C,
    grid: TimeGrid,
) where
    T: fmt::Debug,
    E: fmt::Debug + PartialEq,
    C: ValueComparer<T>,
{
    // A comparer error here was already returned from the assertion itself
    let Ok(mismatches) = collect_mismatches(actual, expected, comparer, grid) else {
        return;
    };
    for mismatch in mismatches {
        warn!(%scope, diagram, %mismatch, "{}", log_messages::assertions::MISMATCH_DETAIL);
    }
}

thread_local! {
    static SCOPES: RefCell<Vec<ScopeHandle>> = const { RefCell::new(Vec::new()) };
    static NEXT_SCOPE_ID: Cell<u64> = const { Cell::new(1) };
}

/// Push a new scope onto this thread's stack, making it current
pub fn begin_scope(options: ScopeOptions) -> ScopeGuard {
    let id = NEXT_SCOPE_ID.with(|next| {
        let id = next.get();
        next.set(id + 1);
        ScopeId::new(id)
    });

    let handle = ScopeHandle(Rc::new(TestScope::new(id, options)));
    handle.0.phase.set(ScopePhase::Active);
    let depth = SCOPES.with(|scopes| {
        let mut scopes = scopes.borrow_mut();
        scopes.push(handle.clone());
        scopes.len()
    });
    debug!(scope = %id, depth, "{}", log_messages::scope::BEGIN);

    ScopeGuard {
        handle,
        ended: false,
    }
}

/// The innermost active scope on this thread
pub fn current_scope() -> Result<ScopeHandle> {
    SCOPES
        .with(|scopes| scopes.borrow().last().cloned())
        .ok_or(Error::NoActiveScope)
}

/// Number of scopes active on this thread
pub fn scope_depth() -> usize {
    SCOPES.with(|scopes| scopes.borrow().len())
}

/// Removes a scope from the stack when dropped, even if an assertion panics
struct PopOnExit(ScopeId);

impl Drop for PopOnExit {
    fn drop(&mut self) {
        remove_scope(self.0);
    }
}

fn remove_scope(id: ScopeId) {
    SCOPES.with(|scopes| {
        // try_borrow_mut: this may run during thread-local teardown
        if let Ok(mut scopes) = scopes.try_borrow_mut() {
            if let Some(position) = scopes.iter().rposition(|scope| scope.id() == id) {
                scopes.remove(position);
            }
        }
    });
}

fn end_scope(handle: &ScopeHandle) -> Result<()> {
    let innermost = SCOPES.with(|scopes| scopes.borrow().last().map(ScopeHandle::id));
    match innermost {
        Some(innermost) if innermost == handle.id() => {}
        Some(innermost) => {
            return Err(Error::UnbalancedScope {
                attempted: handle.id(),
                innermost,
            })
        }
        None => return Err(Error::NoActiveScope),
    }

    let _pop = PopOnExit(handle.id());
    handle.0.run_assertions()
}

/// Ends its scope when dropped
///
/// Prefer [`ScopeGuard::end`], which returns the outcome. Dropping an
/// un-ended guard ends the scope and panics if any assertion failed; during
/// a panic the scope is popped and its pending assertions are discarded.
#[must_use = "the scope ends as soon as the guard is dropped"]
pub struct ScopeGuard {
    handle: ScopeHandle,
    ended: bool,
}

impl ScopeGuard {
    pub fn handle(&self) -> &ScopeHandle {
        &self.handle
    }

    /// Run the scope's assertions and pop it
    ///
    /// Fails with [`Error::UnbalancedScope`] if a scope opened later is still
    /// active. The rejected scope is then abandoned: its pending assertions are
    /// discarded and it leaves the stack, while the later scopes stay usable.
    pub fn end(mut self) -> Result<()> {
        self.ended = true;
        let outcome = end_scope(&self.handle);
        if matches!(outcome, Err(Error::UnbalancedScope { .. })) {
            self.abandon(log_messages::scope::ABANDONED_OUT_OF_ORDER);
        }
        outcome
    }

    fn abandon(&self, reason: &str) {
        warn!(scope = %self.handle.id(), pending = self.handle.pending_assertions(), "{}", reason);
        self.handle.0.phase.set(ScopePhase::Disposed);
        let discarded = std::mem::take(&mut *self.handle.0.assertions.borrow_mut());
        drop(discarded);
        remove_scope(self.handle.id());
    }
}

impl Deref for ScopeGuard {
    type Target = ScopeHandle;

    fn deref(&self) -> &ScopeHandle {
        &self.handle
    }
}

impl fmt::Debug for ScopeGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeGuard")
            .field("scope", &self.handle.id())
            .field("ended", &self.ended)
            .finish()
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;

        if std::thread::panicking() {
            self.abandon(log_messages::scope::ABANDONED_DURING_PANIC);
            return;
        }

        if let Err(failure) = end_scope(&self.handle) {
            if matches!(failure, Error::UnbalancedScope { .. }) {
                self.abandon(log_messages::scope::ABANDONED_OUT_OF_ORDER);
            }
            panic!("{failure}");
        }
    }
}

/// Run `body` inside a fresh scope, then end it on every exit path
///
/// An error returned by `body` takes precedence over assertion failures.
pub fn run_marble_test<R>(
    options: ScopeOptions,
    body: impl FnOnce(&ScopeHandle) -> Result<R>,
) -> Result<R> {
    let guard = begin_scope(options);
    let outcome = body(guard.handle());
    let ended = guard.end();
    let value = outcome?;
    ended?;
    Ok(value)
}
