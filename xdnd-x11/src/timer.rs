use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use calloop::timer::{TimeoutAction, Timer};
use calloop::{LoopHandle, RegistrationToken};
use tracing::trace;
use xdnd_core::error::WireError;
use xdnd_core::services::TimerService;

type TickCallback<Data> = Rc<RefCell<dyn FnMut(&mut Data)>>;

/// A [`TimerService`] ticking on a calloop event loop.
///
/// `on_tick` gets the loop's shared data and is expected to call the session's
/// `on_timer_tick`.
pub struct CalloopTimer<Data: 'static> {
    handle: LoopHandle<'static, Data>,
    on_tick: TickCallback<Data>,
    token: Option<RegistrationToken>,
}

impl<Data: 'static> fmt::Debug for CalloopTimer<Data> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalloopTimer").field("running", &self.token.is_some()).finish()
    }
}

impl<Data: 'static> CalloopTimer<Data> {
    pub fn new(
        handle: LoopHandle<'static, Data>,
        on_tick: impl FnMut(&mut Data) + 'static,
    ) -> Self {
        Self { handle, on_tick: Rc::new(RefCell::new(on_tick)), token: None }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.token.is_some()
    }
}

impl<Data: 'static> TimerService for CalloopTimer<Data> {
    fn start(&mut self, interval: Duration) -> Result<(), WireError> {
        self.cancel();
        let on_tick = self.on_tick.clone();
        let timer = Timer::from_duration(interval);
        let token = self
            .handle
            .insert_source(timer, move |_, _, data| {
                (*on_tick.borrow_mut())(data);
                TimeoutAction::ToDuration(interval)
            })
            .map_err(|err| xdnd_core::wire_error!(err.error))?;
        trace!("drag timer registered, every {interval:?}");
        self.token = Some(token);
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(token) = self.token.take() {
            self.handle.remove(token);
        }
    }
}

impl<Data: 'static> Drop for CalloopTimer<Data> {
    fn drop(&mut self) {
        self.cancel();
    }
}
