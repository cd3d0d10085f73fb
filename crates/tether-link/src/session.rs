// ABOUTME: State of the single in-flight link attempt and its terminal outcomes
// ABOUTME: Tracks mode transitions and the one-shot discovery activation

use tracing::debug;

/// Which pairing path the session is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    AutoDiscovery,
    ManualCode,
    Done,
}

/// Lifecycle of discovery within a session. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiscoveryState {
    Idle,
    Active,
    Stopped,
}

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The device holds an account token.
    Linked,
    /// The manual step got no code.
    NoCode,
    /// A code was rejected or the server was unreachable.
    Failed,
    /// The operator interrupted the process.
    Interrupted,
}

impl LinkOutcome {
    pub fn exit_code(self) -> u8 {
        match self {
            LinkOutcome::Linked => 0,
            LinkOutcome::NoCode => 255,
            LinkOutcome::Failed => 1,
            LinkOutcome::Interrupted => 130,
        }
    }
}

/// The single link attempt of this process.
#[derive(Debug)]
pub struct LinkSession {
    already_linked: bool,
    mode: LinkMode,
    discovery: DiscoveryState,
    declined_auto: bool,
}

impl LinkSession {
    pub fn new(already_linked: bool) -> Self {
        Self {
            already_linked,
            mode: LinkMode::AutoDiscovery,
            discovery: DiscoveryState::Idle,
            declined_auto: false,
        }
    }

    pub fn already_linked(&self) -> bool {
        self.already_linked
    }

    pub fn mode(&self) -> LinkMode {
        self.mode
    }

    pub fn discovery(&self) -> DiscoveryState {
        self.discovery
    }

    /// True once the operator chose the verification code over discovery.
    pub fn declined_auto(&self) -> bool {
        self.declined_auto
    }

    /// Returns false if discovery was already started once in this session.
    pub fn discovery_started(&mut self) -> bool {
        if self.discovery != DiscoveryState::Idle {
            return false;
        }
        self.discovery = DiscoveryState::Active;
        debug!("discovery active");
        true
    }

    pub fn discovery_stopped(&mut self) {
        if self.discovery == DiscoveryState::Active {
            self.discovery = DiscoveryState::Stopped;
            debug!("discovery stopped");
        }
    }

    pub fn switch_to_manual(&mut self) {
        self.declined_auto = true;
    }

    pub fn enter_manual(&mut self) {
        if self.mode == LinkMode::AutoDiscovery {
            self.mode = LinkMode::ManualCode;
        }
    }

    pub fn finish(&mut self, outcome: LinkOutcome) -> LinkOutcome {
        self.mode = LinkMode::Done;
        debug!(?outcome, "link session finished");
        outcome
    }
}
