use quiz_core::model::TestId;
use tokio::sync::mpsc;

/// Screens the core can ask the host to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Menu,
    Results,
    Test { test_id: TestId, title: String },
}

/// Navigation collaborator; the core only ever requests a screen change.
pub trait Navigator: Send + Sync {
    fn go_to(&self, route: Route);
}

/// Forwards navigation requests to whoever owns the receiving end.
#[derive(Clone, Debug)]
pub struct ChannelNavigator {
    tx: mpsc::UnboundedSender<Route>,
}

impl ChannelNavigator {
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Route>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Navigator for ChannelNavigator {
    fn go_to(&self, route: Route) {
        if self.tx.send(route).is_err() {
            tracing::debug!("navigation receiver gone, dropping route");
        }
    }
}
