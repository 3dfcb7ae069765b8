//! Multi-tab simulation used by the CLI
//!
//! Every simulated tab is a task on a `tokio` `LocalSet`. A tab drains its
//! store inbox once per tick, the way a browser delivers storage events on
//! its event loop, and the first tab performs the configured increments.

use anyhow::{anyhow, Context as _, Result};
use serde::{Deserialize, Serialize};
use std::rc::Rc;
use std::time::Duration;
use tokio::task::LocalSet;
use tracing::info;

use crate::config::SyncConfig;
use crate::state::{use_tabs_state, TabsState};
use crate::store::{BroadcastHub, MemoryStore, SharedStore};

/// Ticks every tab keeps running after the last update
const SETTLE_TICKS: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    pub count: i64,
}

#[derive(Debug, Clone)]
pub struct SimulationOptions {
    pub tabs: usize,
    pub channel: String,
    pub updates: usize,
    pub tick: Duration,
    pub config: SyncConfig,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            tabs: 3,
            channel: "shared".to_string(),
            updates: 5,
            tick: Duration::from_millis(10),
            config: SyncConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabOutcome {
    pub index: usize,
    pub state: Counter,
    pub initialised: bool,
    pub errors: usize,
}

#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub tabs: Vec<TabOutcome>,
}

impl SimulationReport {
    /// All tabs hold the same value
    pub fn converged(&self) -> bool {
        self.tabs.windows(2).all(|pair| pair[0].state == pair[1].state)
    }

    pub fn errors(&self) -> usize {
        self.tabs.iter().map(|tab| tab.errors).sum()
    }
}

struct Tab {
    store: Rc<MemoryStore>,
    state: TabsState<Counter>,
    errors: usize,
}

/// Run `options.tabs` tabs on one channel until every update has settled
pub async fn simulate(options: &SimulationOptions) -> Result<SimulationReport> {
    if options.tabs == 0 {
        return Err(anyhow!("simulation needs at least one tab"));
    }
    if options.tick.is_zero() {
        return Err(anyhow!("simulation tick must be greater than zero"));
    }

    let local = LocalSet::new();
    local.run_until(run_tabs(options.clone())).await
}

async fn run_tabs(options: SimulationOptions) -> Result<SimulationReport> {
    let hub = BroadcastHub::with_config(&options.config);

    // Connect first so every tab sees every other tab's mount-time ask
    let stores: Vec<Rc<MemoryStore>> = (0..options.tabs).map(|_| Rc::new(hub.connect())).collect();

    let mut handles = Vec::with_capacity(stores.len());
    for (index, store) in stores.into_iter().enumerate() {
        let shared: SharedStore = store.clone();
        let state = use_tabs_state(shared, Counter::default(), options.channel.clone())
            .with_context(|| format!("failed to mount tab {index}"))?;

        let updates = if index == 0 { options.updates } else { 0 };
        let rounds = options.updates + SETTLE_TICKS;
        let tab = Tab {
            store,
            state,
            errors: 0,
        };
        handles.push(tokio::task::spawn_local(run_tab(tab, updates, rounds, options.tick)));
    }

    let mut tabs = Vec::with_capacity(handles.len());
    for handle in handles {
        tabs.push(handle.await.context("tab task panicked")??);
    }

    // Drain whatever arrived after a tab's last tick
    let mut outcomes = Vec::with_capacity(tabs.len());
    for (index, mut tab) in tabs.into_iter().enumerate() {
        tab.errors += tab.store.dispatch_pending().errors.len();
        outcomes.push(TabOutcome {
            index,
            state: tab.state.get(),
            initialised: tab.state.is_initialised(),
            errors: tab.errors,
        });
    }

    let report = SimulationReport { tabs: outcomes };
    info!(
        tabs = report.tabs.len(),
        converged = report.converged(),
        "simulation finished"
    );
    Ok(report)
}

async fn run_tab(mut tab: Tab, updates: usize, rounds: usize, tick: Duration) -> Result<Tab> {
    let mut interval = tokio::time::interval(tick);
    let set_count = tab.state.setter();

    for round in 0..rounds {
        interval.tick().await;
        tab.errors += tab.store.dispatch_pending().errors.len();

        if round < updates {
            set_count.update(|counter: &Counter| Counter {
                count: counter.count + 1,
            })?;
        }
    }

    Ok(tab)
}

/// Canned end-to-end scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// A updates while B is running; B follows
    Update,
    /// C joins while A holds a value and adopts it
    LateJoin,
    /// D and E start together on an empty channel
    Simultaneous,
}

#[derive(Debug, Clone)]
pub struct ScenarioReport {
    pub scenario: Scenario,
    pub participants: Vec<(&'static str, Counter)>,
}

/// Run one scenario synchronously on channel `"shared"`
pub fn run_scenario(scenario: Scenario) -> Result<ScenarioReport> {
    let hub = BroadcastHub::new();
    let participants = match scenario {
        Scenario::Update => {
            let (a_store, a) = mount(&hub)?;
            let (b_store, b) = mount(&hub)?;
            settle(&[&a_store, &b_store]);

            a.set(Counter { count: 1 })?;
            settle(&[&a_store, &b_store]);
            vec![("A", a.get()), ("B", b.get())]
        }
        Scenario::LateJoin => {
            let (a_store, a) = mount(&hub)?;
            a.set(Counter { count: 1 })?;

            let (c_store, c) = mount(&hub)?;
            settle(&[&a_store, &c_store]);
            vec![("A", a.get()), ("C", c.get())]
        }
        Scenario::Simultaneous => {
            let d_store = Rc::new(hub.connect());
            let e_store = Rc::new(hub.connect());
            let d = use_tabs_state(d_store.clone() as SharedStore, Counter::default(), "shared")?;
            let e = use_tabs_state(e_store.clone() as SharedStore, Counter::default(), "shared")?;
            settle(&[&d_store, &e_store]);
            vec![("D", d.get()), ("E", e.get())]
        }
    };

    Ok(ScenarioReport {
        scenario,
        participants,
    })
}

fn mount(hub: &BroadcastHub) -> Result<(Rc<MemoryStore>, TabsState<Counter>)> {
    let store = Rc::new(hub.connect());
    let state = use_tabs_state(store.clone() as SharedStore, Counter::default(), "shared")?;
    Ok((store, state))
}

/// Pump every store until no notification is left anywhere
fn settle(stores: &[&Rc<MemoryStore>]) {
    while stores.iter().any(|store| store.pending() > 0) {
        for store in stores {
            store.dispatch_pending();
        }
    }
}
