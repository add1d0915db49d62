//! The MUSH session: one task owns the connection state, the roster and the
//! location cache, and is the only thing that ever mutates them.
//!
//! Ticks from the scheduler and messages/errors from the current link all
//! arrive on a single event queue, so every transition sees a consistent state.
//! Readers get immutable snapshots through a `watch` channel.

use std::collections::HashMap;
use std::sync::Arc;

use mushproto::{location_query, parse_location, parse_roster, Player, WHO_COMMAND};
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::locations::{Insert, LocationCache, UnresolvedQueue};

const MAX_BACKOFF_TICKS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    LoggingIn,
    Idle,
    AwaitingRoster,
    AwaitingLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub u64);

impl std::fmt::Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "link-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Tick,
    Message { link: LinkId, text: String },
    LinkError { link: LinkId, error: String },
}

/// Our end of one connection attempt.
///
/// Outbound lines are queued without waiting. Dropping the link, or calling
/// `cancel`, tells the transport to tear the connection down.
#[derive(Debug)]
pub struct Link {
    id: LinkId,
    outbound: mpsc::UnboundedSender<String>,
    cancel: oneshot::Sender<()>,
}

impl Link {
    pub fn new(
        id: LinkId,
        outbound: mpsc::UnboundedSender<String>,
        cancel: oneshot::Sender<()>,
    ) -> Self {
        Self {
            id,
            outbound,
            cancel,
        }
    }

    pub fn id(&self) -> LinkId {
        self.id
    }

    pub(crate) fn send(&self, line: String) {
        if self.outbound.send(line).is_err() {
            // The transport already quit; its error event is on the way.
            debug!(link = %self.id, "outbound dropped; link closed");
        }
    }

    pub(crate) fn cancel(self) {
        let _ = self.cancel.send(());
    }
}

/// Starts connections to the MUSH.
///
/// The transport reports every received message and its terminal error as
/// events tagged with `link`, on `events`.
pub trait Connector {
    fn connect(&self, link: LinkId, events: mpsc::Sender<Event>) -> Link;
}

/// What the HTTP side gets to see.
#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    pub players: Vec<Player>,
    pub locations: Arc<HashMap<String, String>>,
}

impl Snapshot {
    /// Display name for a player's location, or the raw id while unresolved.
    pub fn location_of<'a>(&'a self, player: &'a Player) -> &'a str {
        self.locations
            .get(&player.location_id)
            .map(String::as_str)
            .unwrap_or(&player.location_id)
    }
}

pub struct Session<C> {
    connect_command: String,
    connector: C,
    events: mpsc::Sender<Event>,
    snapshots: watch::Sender<Arc<Snapshot>>,

    state: SessionState,
    link: Option<Link>,
    next_link: u64,
    failures: u32,
    backoff_ticks: u32,

    roster: Vec<Player>,
    cache: LocationCache,
    queue: UnresolvedQueue,
}

impl<C: Connector> Session<C> {
    pub fn new(
        connect_command: String,
        connector: C,
        events: mpsc::Sender<Event>,
        snapshots: watch::Sender<Arc<Snapshot>>,
    ) -> Self {
        Self {
            connect_command,
            connector,
            events,
            snapshots,
            state: SessionState::Disconnected,
            link: None,
            next_link: 0,
            failures: 0,
            backoff_ticks: 0,
            roster: Vec::new(),
            cache: LocationCache::new(),
            queue: UnresolvedQueue::new(),
        }
    }

    /// Process events until shutdown. The current link is cancelled on the way out.
    pub async fn run(mut self, mut events: mpsc::Receiver<Event>, shutdown: watch::Receiver<bool>) {
        let stop = crate::wait_for_shutdown(shutdown);
        tokio::pin!(stop);

        loop {
            tokio::select! {
                biased;
                _ = &mut stop => {
                    info!(state = ?self.state, "session stopping");
                    break;
                }
                ev = events.recv() => {
                    let Some(ev) = ev else {
                        break;
                    };
                    self.handle(ev);
                }
            }
        }

        if let Some(link) = self.link.take() {
            link.cancel();
        }
    }

    pub fn handle(&mut self, ev: Event) {
        match ev {
            Event::Tick => self.on_tick(),
            Event::Message { link, text } => {
                if self.is_current(link) || self.state == SessionState::Disconnected {
                    self.on_message(&text);
                } else {
                    warn!(link = %link, state = ?self.state, "message from stale link ignored");
                }
            }
            Event::LinkError { link, error } => {
                if self.is_current(link) {
                    self.on_link_error(&error);
                } else {
                    debug!(link = %link, err = %error, "error from stale link ignored");
                }
            }
        }
    }

    pub fn on_tick(&mut self) {
        match self.state {
            SessionState::Disconnected => {
                if self.backoff_ticks > 0 {
                    self.backoff_ticks -= 1;
                    debug!(remaining = self.backoff_ticks, "reconnect backoff");
                    return;
                }
                self.connect();
            }
            SessionState::Idle => {
                if let Some(id) = self.queue.head() {
                    let cmd = location_query(id);
                    debug!(id = %id, pending = ?self.queue.iter().collect::<Vec<_>>(), "resolving location");
                    self.send(cmd);
                    self.transition(SessionState::AwaitingLocation);
                } else {
                    self.send(WHO_COMMAND.to_string());
                    self.transition(SessionState::AwaitingRoster);
                }
            }
            // A command is already in flight.
            SessionState::Connecting
            | SessionState::LoggingIn
            | SessionState::AwaitingRoster
            | SessionState::AwaitingLocation => {}
        }
    }

    pub fn on_message(&mut self, text: &str) {
        match self.state {
            SessionState::Disconnected | SessionState::Idle => {
                warn!(state = ?self.state, text = %text.trim_end(), "unexpected message ignored");
            }
            SessionState::Connecting => {
                info!("logging in");
                self.send(self.connect_command.clone());
                self.transition(SessionState::LoggingIn);
            }
            SessionState::LoggingIn => {
                info!("login complete");
                self.failures = 0;
                self.transition(SessionState::Idle);
            }
            SessionState::AwaitingRoster => {
                self.transition(SessionState::Idle);
                self.apply_roster(text);
            }
            SessionState::AwaitingLocation => {
                self.transition(SessionState::Idle);
                self.apply_location(text);
            }
        }
    }

    pub fn on_link_error(&mut self, error: &str) {
        self.failures = self.failures.saturating_add(1);
        self.backoff_ticks = backoff_ticks(self.failures);
        warn!(
            err = %error,
            state = ?self.state,
            failures = self.failures,
            backoff_ticks = self.backoff_ticks,
            "mush link failed"
        );
        if let Some(link) = self.link.take() {
            link.cancel();
        }
        self.transition(SessionState::Disconnected);
    }

    fn connect(&mut self) {
        self.next_link += 1;
        let id = LinkId(self.next_link);
        info!(link = %id, "connecting");
        self.link = Some(self.connector.connect(id, self.events.clone()));
        self.transition(SessionState::Connecting);
    }

    fn apply_roster(&mut self, text: &str) {
        match parse_roster(text) {
            Ok(roster) => {
                self.roster = roster;
                self.queue.rebuild(&self.roster, &self.cache);
                info!(
                    players = self.roster.len(),
                    unresolved = self.queue.len(),
                    "roster updated"
                );
                self.publish();
            }
            Err(e) => warn!(err = %e, "bad who reply; keeping previous roster"),
        }
    }

    fn apply_location(&mut self, text: &str) {
        let (id, name) = match parse_location(text) {
            Ok(v) => v,
            Err(e) => {
                warn!(err = %e, text = %text.trim_end(), "bad location reply");
                return;
            }
        };
        if self.cache.insert(&id, &name) == Insert::Added {
            info!(id = %id, name = %name, known = self.cache.len(), "location resolved");
            self.publish();
        }
        if !self.queue.pop_if_head(&id) {
            // Stale reply for an id that is no longer first in line; the head
            // stays queued and is asked for again on the next idle tick.
            warn!(id = %id, head = ?self.queue.head(), "location reply does not match queue head");
        }
    }

    fn publish(&self) {
        let snap = Snapshot {
            players: self.roster.clone(),
            locations: self.cache.shared(),
        };
        self.snapshots.send_replace(Arc::new(snap));
    }

    fn send(&self, line: String) {
        match &self.link {
            Some(link) => link.send(line),
            None => warn!(state = ?self.state, "no link; outbound dropped"),
        }
    }

    fn is_current(&self, link: LinkId) -> bool {
        self.link.as_ref().map(Link::id) == Some(link)
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, "session state");
        }
        self.state = next;
    }
}

/// Ticks to sit out after the `failures`-th consecutive link failure:
/// 0, 1, 3, 7, 7, ...
fn backoff_ticks(failures: u32) -> u32 {
    let pow = failures.saturating_sub(1).min(31);
    (1u32 << pow).saturating_sub(1).min(MAX_BACKOFF_TICKS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const WHO: &str = "Player Name        On For Idle  Room    Cmds Host\n\
Alice               00:12   3s  #42     17 localhost\n\
Bob                 01:02   1m  #7      3 example.org\n\
Carol               00:40   9s  #42     1 localhost\n\
3 Players logged in.\n";

    #[derive(Clone, Default)]
    struct FakeConnector {
        links: Arc<Mutex<Vec<FakeLink>>>,
    }

    struct FakeLink {
        id: LinkId,
        outbound: mpsc::UnboundedReceiver<String>,
        cancel: oneshot::Receiver<()>,
    }

    impl Connector for FakeConnector {
        fn connect(&self, link: LinkId, _events: mpsc::Sender<Event>) -> Link {
            let (out_tx, out_rx) = mpsc::unbounded_channel();
            let (cancel_tx, cancel_rx) = oneshot::channel();
            self.links.lock().unwrap().push(FakeLink {
                id: link,
                outbound: out_rx,
                cancel: cancel_rx,
            });
            Link::new(link, out_tx, cancel_tx)
        }
    }

    impl FakeConnector {
        fn connects(&self) -> usize {
            self.links.lock().unwrap().len()
        }

        fn last_id(&self) -> LinkId {
            self.links.lock().unwrap().last().unwrap().id
        }

        /// Lines written to the newest link since the last call.
        fn sent(&self) -> Vec<String> {
            let mut links = self.links.lock().unwrap();
            let link = links.last_mut().unwrap();
            let mut out = Vec::new();
            while let Ok(l) = link.outbound.try_recv() {
                out.push(l);
            }
            out
        }
    }

    impl<C> Session<C> {
        fn state(&self) -> SessionState {
            self.state
        }

        fn roster(&self) -> &[Player] {
            &self.roster
        }

        fn cache(&self) -> &LocationCache {
            &self.cache
        }

        fn queue(&self) -> &UnresolvedQueue {
            &self.queue
        }
    }

    struct Harness {
        session: Session<FakeConnector>,
        conn: FakeConnector,
        snapshots: watch::Receiver<Arc<Snapshot>>,
        _events: mpsc::Receiver<Event>,
    }

    fn harness() -> Harness {
        let conn = FakeConnector::default();
        let (events_tx, events_rx) = mpsc::channel(16);
        let (snap_tx, snap_rx) = watch::channel(Arc::new(Snapshot::default()));
        let session = Session::new(
            "connect Watcher hunter2".to_string(),
            conn.clone(),
            events_tx,
            snap_tx,
        );
        Harness {
            session,
            conn,
            snapshots: snap_rx,
            _events: events_rx,
        }
    }

    fn logged_in() -> Harness {
        let mut h = harness();
        h.session.on_tick();
        h.session.on_message("Welcome to Midgaard\n");
        h.session.on_message("Last connect was from localhost.\n");
        assert_eq!(h.session.state(), SessionState::Idle);
        h.conn.sent();
        h
    }

    fn locations(s: &Session<FakeConnector>) -> Vec<(String, Option<String>)> {
        s.roster()
            .iter()
            .map(|p| {
                (
                    p.location_id.clone(),
                    s.cache().lookup(&p.location_id).map(str::to_string),
                )
            })
            .collect()
    }

    #[test]
    fn connect_login_and_poll() {
        let mut h = harness();
        assert_eq!(h.session.state(), SessionState::Disconnected);

        h.session.on_tick();
        assert_eq!(h.session.state(), SessionState::Connecting);
        assert_eq!(h.conn.connects(), 1);

        h.session.on_message("Welcome to Midgaard\n");
        assert_eq!(h.session.state(), SessionState::LoggingIn);
        assert_eq!(h.conn.sent(), vec!["connect Watcher hunter2".to_string()]);

        h.session.on_message("anything at all\n");
        assert_eq!(h.session.state(), SessionState::Idle);

        h.session.on_tick();
        assert_eq!(h.session.state(), SessionState::AwaitingRoster);
        assert_eq!(h.conn.sent(), vec!["who".to_string()]);

        h.session.on_message(WHO);
        assert_eq!(h.session.state(), SessionState::Idle);
        let names = h
            .session
            .roster()
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Alice", "Bob", "Carol"]);
        assert_eq!(h.session.queue().iter().collect::<Vec<_>>(), vec!["#42", "#7"]);
        assert_eq!(h.snapshots.borrow().players.len(), 3);
    }

    #[test]
    fn ticks_while_waiting_are_ignored() {
        let mut h = harness();
        h.session.on_tick();
        h.session.on_tick();
        assert_eq!(h.session.state(), SessionState::Connecting);
        assert_eq!(h.conn.connects(), 1);

        let mut h = logged_in();
        h.session.on_tick();
        h.session.on_tick();
        h.session.on_tick();
        assert_eq!(h.session.state(), SessionState::AwaitingRoster);
        assert_eq!(h.conn.sent(), vec!["who".to_string()]);
    }

    #[test]
    fn unexpected_messages_are_ignored() {
        let mut h = harness();
        h.session.on_message("noise\n");
        assert_eq!(h.session.state(), SessionState::Disconnected);
        assert_eq!(h.conn.connects(), 0);

        let mut h = logged_in();
        h.session.on_message("Bob says, \"hi\"\n");
        assert_eq!(h.session.state(), SessionState::Idle);
        assert!(h.conn.sent().is_empty());
    }

    #[test]
    fn resolves_queue_then_polls_again() {
        let mut h = logged_in();
        h.session.on_tick();
        h.session.on_message(WHO);
        h.conn.sent();

        h.session.on_tick();
        assert_eq!(h.session.state(), SessionState::AwaitingLocation);
        assert_eq!(h.conn.sent(), vec!["\"#42\"[name(#42)]".to_string()]);
        h.session.on_message("You say, \"#42\"Temple Square\"\n");
        assert_eq!(h.session.state(), SessionState::Idle);
        assert_eq!(h.session.queue().head(), Some("#7"));

        h.session.on_tick();
        assert_eq!(h.conn.sent(), vec!["\"#7\"[name(#7)]".to_string()]);
        h.session.on_message("You say, \"#7\"Market\"\n");
        assert_eq!(h.session.queue().head(), None);

        assert_eq!(
            locations(&h.session),
            vec![
                ("#42".to_string(), Some("Temple Square".to_string())),
                ("#7".to_string(), Some("Market".to_string())),
                ("#42".to_string(), Some("Temple Square".to_string())),
            ]
        );

        h.session.on_tick();
        assert_eq!(h.session.state(), SessionState::AwaitingRoster);
        assert_eq!(h.conn.sent(), vec!["who".to_string()]);

        // Everything is known now, so the new roster queues nothing.
        h.session.on_message(WHO);
        assert_eq!(h.session.queue().len(), 0);

        let snap = h.snapshots.borrow().clone();
        let shown = snap
            .players
            .iter()
            .map(|p| snap.location_of(p))
            .collect::<Vec<_>>();
        assert_eq!(shown, vec!["Temple Square", "Market", "Temple Square"]);
    }

    #[test]
    fn bad_roster_keeps_previous_one() {
        let mut h = logged_in();
        h.session.on_tick();
        h.session.on_message(WHO);
        h.session.on_tick();
        h.session.on_message("You say, \"#42\"Temple Square\"\n");
        let before = h.session.roster().to_vec();
        let pending = h.session.queue().iter().map(str::to_string).collect::<Vec<_>>();
        assert_eq!(pending, vec!["#7".to_string()]);

        // Resolve the rest so the following ticks poll `who`.
        h.session.on_tick();
        h.session.on_message("You say, \"#7\"Market\"\n");

        for bad in [
            "Huh?  (Type \"help\" for help.)\n",
            "Player Name\nAlice a b #1 c d\nno footer here\n",
            "Alice a b #1 c d\n1 Player logged in.\n",
            "",
        ] {
            h.session.on_tick();
            assert_eq!(h.session.state(), SessionState::AwaitingRoster);
            h.session.on_message(bad);
            assert_eq!(h.session.state(), SessionState::Idle);
            assert_eq!(h.session.roster(), &before[..]);
            assert_eq!(h.session.queue().len(), 0);
        }
        assert_eq!(h.snapshots.borrow().players, before);
    }

    #[test]
    fn bad_location_reply_leaves_id_queued() {
        let mut h = logged_in();
        h.session.on_tick();
        h.session.on_message(WHO);
        h.conn.sent();

        h.session.on_tick();
        h.session.on_message("Huh?  (Type \"help\" for help.)\n");
        assert_eq!(h.session.state(), SessionState::Idle);
        assert_eq!(h.session.cache().len(), 0);
        assert_eq!(h.session.queue().head(), Some("#42"));

        // Retried on the next idle tick.
        h.conn.sent();
        h.session.on_tick();
        assert_eq!(h.conn.sent(), vec!["\"#42\"[name(#42)]".to_string()]);
    }

    #[test]
    fn reply_for_other_id_does_not_pop_head() {
        let mut h = logged_in();
        h.session.on_tick();
        h.session.on_message(WHO);

        h.session.on_tick();
        h.session.on_message("You say, \"#7\"Market\"\n");
        assert_eq!(h.session.cache().lookup("#7"), Some("Market"));
        assert_eq!(
            h.session.queue().iter().collect::<Vec<_>>(),
            vec!["#42", "#7"]
        );
    }

    #[test]
    fn link_error_disconnects_from_any_state() {
        let steps: [fn(&mut Harness); 5] = [
            |_| {},
            |h| h.session.on_message("Welcome\n"),
            |h| {
                h.session.on_message("Welcome\n");
                h.session.on_message("ok\n");
            },
            |h| {
                h.session.on_message("Welcome\n");
                h.session.on_message("ok\n");
                h.session.on_tick();
            },
            |h| {
                h.session.on_message("Welcome\n");
                h.session.on_message("ok\n");
                h.session.on_tick();
                h.session.on_message(WHO);
                h.session.on_tick();
            },
        ];
        let expected = [
            SessionState::Connecting,
            SessionState::LoggingIn,
            SessionState::Idle,
            SessionState::AwaitingRoster,
            SessionState::AwaitingLocation,
        ];

        for (step, want) in steps.iter().zip(expected) {
            let mut h = harness();
            h.session.on_tick();
            step(&mut h);
            assert_eq!(h.session.state(), want);

            let link = h.conn.last_id();
            h.session.handle(Event::LinkError {
                link,
                error: "connection reset".to_string(),
            });
            assert_eq!(h.session.state(), SessionState::Disconnected);

            // Our side cancelled the dead link.
            {
                let mut links = h.conn.links.lock().unwrap();
                assert_eq!(links.last_mut().unwrap().cancel.try_recv(), Ok(()));
            }

            // A second error while already disconnected changes nothing.
            let connects = h.conn.connects();
            h.session.handle(Event::LinkError {
                link,
                error: "broken pipe".to_string(),
            });
            assert_eq!(h.session.state(), SessionState::Disconnected);
            assert_eq!(h.conn.connects(), connects);
        }

        // Same before the first connection attempt.
        let mut h = harness();
        h.session.handle(Event::LinkError {
            link: LinkId(1),
            error: "connection refused".to_string(),
        });
        assert_eq!(h.session.state(), SessionState::Disconnected);
        assert_eq!(h.conn.connects(), 0);
        // No backoff was charged: the next tick dials straight away.
        h.session.on_tick();
        assert_eq!(h.session.state(), SessionState::Connecting);
        assert_eq!(h.conn.connects(), 1);
    }

    #[test]
    fn next_tick_reconnects_with_fresh_link() {
        let mut h = logged_in();
        let first = h.conn.last_id();
        h.session.handle(Event::LinkError {
            link: first,
            error: "eof".to_string(),
        });

        h.session.on_tick();
        assert_eq!(h.session.state(), SessionState::Connecting);
        assert_eq!(h.conn.connects(), 2);
        assert_ne!(h.conn.last_id(), first);

        // Late traffic from the old link must not drive the new one.
        h.session.handle(Event::Message {
            link: first,
            text: "Welcome\n".to_string(),
        });
        h.session.handle(Event::LinkError {
            link: first,
            error: "late".to_string(),
        });
        assert_eq!(h.session.state(), SessionState::Connecting);

        h.session.handle(Event::Message {
            link: h.conn.last_id(),
            text: "Welcome\n".to_string(),
        });
        assert_eq!(h.session.state(), SessionState::LoggingIn);
    }

    #[test]
    fn repeated_failures_back_off() {
        let mut h = harness();
        let fail = |h: &mut Harness| {
            let link = h.conn.last_id();
            h.session.handle(Event::LinkError {
                link,
                error: "refused".to_string(),
            });
        };

        h.session.on_tick();
        fail(&mut h);
        // First failure: straight back on the next tick.
        h.session.on_tick();
        assert_eq!(h.conn.connects(), 2);

        fail(&mut h);
        h.session.on_tick();
        assert_eq!(h.conn.connects(), 2);
        h.session.on_tick();
        assert_eq!(h.conn.connects(), 3);

        // A completed login resets the count.
        h.session.on_message("Welcome\n");
        h.session.on_message("ok\n");
        fail(&mut h);
        h.session.on_tick();
        assert_eq!(h.conn.connects(), 4);
    }

    #[test]
    fn backoff_is_capped() {
        let got = (1..=6).map(backoff_ticks).collect::<Vec<_>>();
        assert_eq!(got, vec![0, 1, 3, 7, 7, 7]);
        assert_eq!(backoff_ticks(u32::MAX), MAX_BACKOFF_TICKS);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn readers_never_see_a_torn_roster() {
        let (events_tx, events_rx) = mpsc::channel(64);
        let (snap_tx, snap_rx) = watch::channel(Arc::new(Snapshot::default()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let conn = FakeConnector::default();
        let session = Session::new(String::new(), conn.clone(), events_tx.clone(), snap_tx);
        let task = tokio::spawn(session.run(events_rx, shutdown_rx));

        let reader = tokio::spawn(async move {
            let mut seen = 0usize;
            for _ in 0..20_000 {
                let snap = snap_rx.borrow().clone();
                let n = snap.players.len();
                for p in &snap.players {
                    assert!(
                        p.name.starts_with(&format!("r{n}_")),
                        "player {} in a roster of {n}",
                        p.name
                    );
                }
                seen = seen.max(n);
                tokio::task::yield_now().await;
            }
            seen
        });

        events_tx.send(Event::Tick).await.unwrap();
        let link = LinkId(1);
        let msg = |text: String| Event::Message { link, text };
        events_tx.send(msg("Welcome\n".into())).await.unwrap();
        events_tx.send(msg("ok\n".into())).await.unwrap();
        for n in 1..=40usize {
            let mut who = String::from("Player Name On For Idle Room\n");
            for i in 0..n {
                who.push_str(&format!("r{n}_{i} 00:01 1s #1 1 localhost\n"));
            }
            who.push_str(&format!("{n} Players logged in.\n"));

            events_tx.send(Event::Tick).await.unwrap();
            events_tx.send(msg(who)).await.unwrap();
            // Resolve #1 once so later ticks keep polling `who`.
            if n == 1 {
                events_tx.send(Event::Tick).await.unwrap();
                events_tx
                    .send(msg("You say, \"#1\"Temple\"\n".into()))
                    .await
                    .unwrap();
            }
        }

        let seen = reader.await.unwrap();
        assert!(seen <= 40);
        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
        assert_eq!(conn.connects(), 1);
    }
}
