use super::GameSignal;

/// Observer of game signals, called after each ingested event that produced any.
pub trait SignalHandler {
    fn handle_signal(&mut self, signal: &GameSignal);

    fn handle_signals(&mut self, signals: &[GameSignal]) {
        for signal in signals {
            self.handle_signal(signal);
        }
    }
}

impl<F> SignalHandler for F
where
    F: FnMut(&GameSignal),
{
    fn handle_signal(&mut self, signal: &GameSignal) {
        self(signal)
    }
}
