// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! The REPL dispatch loop: reads full lines from stdin, routes them to a
//! slash command or to an LLM turn, and applies the resulting [`ReplEffect`]
//! against the store and the focused agent's in-memory session.
use std::collections::HashMap;
use std::io::Write as _;
use std::time::Duration;

use base64::Engine as _;
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};

use ikigai_config::{Config, Credentials};
use ikigai_core::{fanin, next, replay, AgentSession, EntryStatus, WaitResult};
use ikigai_runtime::Paths;
use ikigai_store::{AgentRow, AgentStatus, EventKind, Range, Store};
use ikigai_tools::{ToolCatalog, ToolPolicy};
use ikigai_tui::{builtin::help::render_help, CommandContext, CommandRegistry, ReplEffect};
use ikigai_tui::Scrollback;

/// Bundles every piece of durable/runtime state the dispatch loop needs:
/// the store, the session it's operating within, every in-memory agent
/// touched so far this run, and the focused agent pointer.
pub struct Repl {
    store: Store,
    session_id: i64,
    #[allow(dead_code)]
    paths: Paths,
    credentials: Credentials,
    config: Config,
    tools: ToolCatalog,
    policy: ToolPolicy,
    registry: CommandRegistry,
    agents: HashMap<String, AgentSession>,
    focus: String,
    scrollback: Scrollback,
    system_prompt: Option<String>,
}

impl Repl {
    #[allow(clippy::too_many_arguments)]
    pub async fn new(
        store: Store,
        session_id: i64,
        paths: Paths,
        credentials: Credentials,
        config: Config,
        tools: ToolCatalog,
        policy: ToolPolicy,
        root_uuid: String,
    ) -> anyhow::Result<Self> {
        let mut session = replay(&store, &root_uuid).await?;
        let (provider, model) = restore_model(&store, &root_uuid, &config).await?;
        session.provider = provider;
        session.model = model;
        let system_prompt = restore_system_prompt(&store, &root_uuid, &config).await?;

        let mut agents = HashMap::new();
        agents.insert(root_uuid.clone(), session);

        Ok(Self {
            store,
            session_id,
            paths,
            credentials,
            config,
            tools,
            policy,
            registry: CommandRegistry::with_builtins(),
            agents,
            focus: root_uuid,
            scrollback: Scrollback::new(),
            system_prompt,
        })
    }

    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.store.sessions.close(self.session_id).await?;
        Ok(())
    }

    /// Print a line to the user's terminal and append it to scrollback.
    fn emit(&mut self, text: impl Into<String>) {
        let text = text.into();
        println!("{text}");
        self.scrollback.append(text);
    }

    fn current_uuid(&self) -> String {
        self.focus.clone()
    }

    fn context(&self) -> CommandContext {
        let session = &self.agents[&self.focus];
        CommandContext {
            agent_uuid: self.focus.clone(),
            provider: session.provider.clone(),
            model: session.model.clone(),
            toolset_filter: session.toolset_filter.clone(),
            known_agent_uuids: self.agents.keys().cloned().collect(),
            mark_labels: session.marks.iter().filter_map(|m| m.label.clone()).collect(),
        }
    }

    /// Main loop: read lines from `stdin` until EOF or `/exit`.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        self.emit(format!("ikigai — {} ({})", self.focus, self.agents[&self.focus].model));
        let stdin = tokio::io::stdin();
        let mut lines = BufReader::new(stdin).lines();

        loop {
            print!("[{}] > ", short_uuid(&self.focus));
            std::io::stdout().flush().ok();

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(rest) = line.strip_prefix('/') {
                let (name, args) = tokenise(rest);
                match self.dispatch_command(&name, args).await {
                    Ok(true) => continue,
                    Ok(false) => break,
                    Err(err) => self.emit(format!("error: {err:#}")),
                }
            } else if let Err(err) = self.run_turn(line).await {
                self.emit(format!("error: {err:#}"));
            }
        }
        Ok(())
    }

    /// Dispatch one slash command. Returns `Ok(false)` when the loop should
    /// stop (`/exit`).
    async fn dispatch_command(&mut self, name: &str, args: Vec<String>) -> anyhow::Result<bool> {
        let Some(cmd) = self.registry.get(name) else {
            self.emit(format!("unknown command: /{name}"));
            return Ok(true);
        };
        let ctx = self.context();
        let result = cmd.execute(args.clone(), &ctx);
        if let Some(error) = result.error {
            self.emit(format!("error: {error}"));
            return Ok(true);
        }
        let Some(effect) = result.effect else {
            return Ok(true);
        };
        self.record_command_event(name, &args, &effect).await?;
        self.apply_effect(effect).await
    }

    async fn apply_effect(&mut self, effect: ReplEffect) -> anyhow::Result<bool> {
        match effect {
            ReplEffect::Fork { prompt } => self.do_fork(prompt).await?,
            ReplEffect::Kill { target } => self.do_kill(target).await?,
            ReplEffect::Reap { target } => self.do_reap(target).await?,
            ReplEffect::Send { target, body } => self.do_send(target, body).await?,
            ReplEffect::WaitNext { timeout } => self.do_wait_next(timeout).await?,
            ReplEffect::WaitFanIn { timeout, targets } => self.do_wait_fanin(timeout, targets).await?,
            ReplEffect::Mark { label } => self.do_mark(label).await?,
            ReplEffect::Rewind { mark } => self.do_rewind(mark).await?,
            ReplEffect::Toolset { tools } => self.do_toolset(tools).await?,
            ReplEffect::Agents => self.do_agents().await?,
            ReplEffect::Help => {
                let text = render_help(&self.registry);
                self.emit(text);
            }
            ReplEffect::FilterMail { since } => self.do_filter_mail(since).await?,
            ReplEffect::System { prompt } => self.do_system(prompt),
            ReplEffect::Model { provider, model } => self.do_model(provider, model).await?,
            ReplEffect::Clear => self.do_clear().await?,
            ReplEffect::Exit => return Ok(false),
        }
        Ok(true)
    }

    async fn do_fork(&mut self, prompt: Option<String>) -> anyhow::Result<()> {
        let parent_uuid = self.current_uuid();
        let child_uuid = new_agent_uuid();

        let toolset_filter = self.agents[&parent_uuid].toolset_filter.clone();
        let data = serde_json::json!({ "toolset_filter": toolset_filter });
        let fork_id = self
            .store
            .events
            .append(self.session_id, Some(&parent_uuid), EventKind::Fork, prompt.as_deref(), Some(&data))
            .await?;

        let child = self.agents[&parent_uuid].fork_child(child_uuid.clone(), prompt.as_deref());
        self.store
            .registry
            .insert(&AgentRow {
                uuid: child_uuid.clone(),
                name: None,
                parent_uuid: Some(parent_uuid.clone()),
                created_at: Utc::now().timestamp(),
                fork_message_id: fork_id,
                status: AgentStatus::Running,
                ended_at: None,
                idle: false,
                session_id: self.session_id,
            })
            .await?;

        self.agents.insert(child_uuid.clone(), child);
        self.focus = child_uuid.clone();
        self.emit(format!("forked {child_uuid}, now focused"));
        Ok(())
    }

    async fn do_kill(&mut self, target: Option<String>) -> anyhow::Result<()> {
        let target = target.unwrap_or_else(|| self.current_uuid());
        let ended_at = Utc::now().timestamp();
        for uuid in collect_descendants(&self.store, &target).await?.into_iter().chain([target.clone()]) {
            self.store.registry.mark_dead(&uuid, ended_at).await?;
            self.store.events.append(self.session_id, Some(&uuid), EventKind::AgentKilled, None, None).await?;
        }
        self.emit(format!("killed {target} (and its descendants)"));
        if target == self.focus {
            self.focus = first_surviving_root(&self.store, self.session_id, &self.agents).await?;
        }
        Ok(())
    }

    async fn do_reap(&mut self, target: Option<String>) -> anyhow::Result<()> {
        let reaped = match target {
            Some(uuid) => {
                self.agents.remove(&uuid);
                vec![uuid]
            }
            None => {
                let current = self.current_uuid();
                let dead = dead_and_tainted_agents(&self.store, &current).await?;
                for uuid in &dead {
                    self.agents.remove(uuid);
                }
                dead
            }
        };
        self.emit(format!("reaped {} agent(s)", reaped.len()));
        Ok(())
    }

    async fn do_send(&mut self, target: String, body: String) -> anyhow::Result<()> {
        let from = self.current_uuid();
        match self
            .store
            .mailbox
            .send(&self.store.registry, self.session_id, &from, &target, &body, Utc::now().timestamp())
            .await
        {
            Ok(_) => self.emit(format!("sent to {target}")),
            Err(err) => self.emit(format!("error: {err}")),
        }
        Ok(())
    }

    async fn do_wait_next(&mut self, timeout: Duration) -> anyhow::Result<()> {
        let me = self.current_uuid();
        let interrupted = std::sync::Arc::clone(&self.agents[&me].interrupted);
        match next(&self.store, timeout, &me, &interrupted).await? {
            WaitResult::Received { from, body } => self.emit(format!("[{from}] {body}")),
            WaitResult::Timeout => self.emit("wait timed out"),
            WaitResult::Interrupted => self.emit("wait interrupted"),
        }
        Ok(())
    }

    async fn do_wait_fanin(&mut self, timeout: Duration, targets: Vec<String>) -> anyhow::Result<()> {
        let me = self.current_uuid();
        let interrupted = std::sync::Arc::clone(&self.agents[&me].interrupted);
        let result = fanin(&self.store, timeout, &me, &targets, &interrupted).await?;
        for (uuid, entry) in &result.entries {
            let status = match &entry.status {
                EntryStatus::Pending => "pending".to_string(),
                EntryStatus::Received { body } => format!("received: {body}"),
                EntryStatus::Idle => "idle".to_string(),
                EntryStatus::Dead => "dead".to_string(),
                EntryStatus::Timeout => "timeout".to_string(),
            };
            self.emit(format!("{} ({uuid}): {status}", entry.agent_name));
        }
        Ok(())
    }

    async fn do_mark(&mut self, label: Option<String>) -> anyhow::Result<()> {
        let uuid = self.current_uuid();
        let idx = self.agents.get_mut(&uuid).expect("focused agent exists").push_mark(label.clone());
        let data = serde_json::json!({ "label": label });
        self.store.events.append(self.session_id, Some(&uuid), EventKind::Mark, None, Some(&data)).await?;
        self.emit(format!("mark #{idx} pushed"));
        Ok(())
    }

    async fn do_rewind(&mut self, mark: String) -> anyhow::Result<()> {
        let uuid = self.current_uuid();
        let session = self.agents.get_mut(&uuid).expect("focused agent exists");
        let mark_index = match mark.parse::<usize>() {
            Ok(idx) => Some(idx),
            Err(_) => session.marks.iter().rposition(|m| m.label.as_deref() == Some(mark.as_str())),
        };
        let Some(mark_index) = mark_index else {
            self.emit(format!("no such mark: {mark}"));
            return Ok(());
        };
        let Some(message_count) = session.rewind_to(mark_index) else {
            self.emit(format!("no such mark: {mark}"));
            return Ok(());
        };
        let data = serde_json::json!({ "message_count": message_count });
        self.store.events.append(self.session_id, Some(&uuid), EventKind::Rewind, None, Some(&data)).await?;
        self.emit(format!("rewound to {message_count} message(s)"));
        Ok(())
    }

    async fn do_toolset(&mut self, tools: Vec<String>) -> anyhow::Result<()> {
        let uuid = self.current_uuid();
        self.agents.get_mut(&uuid).expect("focused agent exists").set_toolset(tools.clone());
        self.emit(format!("toolset: {}", tools.join(", ")));
        Ok(())
    }

    async fn do_agents(&mut self) -> anyhow::Result<()> {
        let rows = self.store.registry.list_all(self.session_id).await?;
        let mut lines = Vec::new();
        for row in &rows {
            let marker = if row.uuid == self.focus { "*" } else { " " };
            let status = match row.status {
                AgentStatus::Running => "running",
                AgentStatus::Dead => "dead",
            };
            lines.push(format!(
                "{marker} {} parent={} status={}",
                row.uuid,
                row.parent_uuid.as_deref().unwrap_or("-"),
                status
            ));
        }
        self.emit(lines.join("\n"));
        Ok(())
    }

    async fn do_filter_mail(&mut self, since: Option<Duration>) -> anyhow::Result<()> {
        let uuid = self.current_uuid();
        let since_ts = since.map(|d| Utc::now().timestamp() - d.as_secs() as i64);
        let mail = self.store.mailbox.peek_filter(&uuid, since_ts).await?;
        if mail.is_empty() {
            self.emit("no pending mail");
        } else {
            for m in mail {
                self.emit(format!("[{}] {}", m.from_uuid, m.body));
            }
        }
        Ok(())
    }

    fn do_system(&mut self, prompt: Option<String>) {
        match prompt {
            Some(p) => {
                self.system_prompt = Some(p);
                self.emit("system prompt updated");
            }
            None => {
                let text = self.system_prompt.clone().unwrap_or_else(|| "(none)".to_string());
                self.emit(text);
            }
        }
    }

    async fn do_model(&mut self, provider: String, model: String) -> anyhow::Result<()> {
        let uuid = self.current_uuid();
        self.agents.get_mut(&uuid).expect("focused agent exists").set_model(provider, model);
        self.emit("model updated");
        Ok(())
    }

    async fn do_clear(&mut self) -> anyhow::Result<()> {
        let uuid = self.current_uuid();
        self.agents.get_mut(&uuid).expect("focused agent exists").clear_messages();
        self.store.events.append(self.session_id, Some(&uuid), EventKind::Clear, None, None).await?;
        self.emit("history cleared");
        Ok(())
    }

    /// Persist a generic `command` event describing the slash command that
    /// just ran, so a later replay can restore `/toolset`/`/model` selection
    /// the same way `restore_toolset`/`restore_model` already do.
    async fn record_command_event(&self, name: &str, args: &[String], effect: &ReplEffect) -> anyhow::Result<()> {
        let uuid = self.current_uuid();
        let mut data = serde_json::json!({ "command": name, "args": args });
        match effect {
            ReplEffect::Toolset { tools } => {
                data["toolset_filter"] = serde_json::json!(tools);
            }
            ReplEffect::Model { provider, model } => {
                data["provider"] = serde_json::json!(provider);
                data["model"] = serde_json::json!(model);
            }
            _ => {}
        }
        self.store.events.append(self.session_id, Some(&uuid), EventKind::Command, None, Some(&data)).await?;
        Ok(())
    }

    async fn run_turn(&mut self, line: &str) -> anyhow::Result<()> {
        let uuid = self.current_uuid();
        crate::turn::run_turn(self, &uuid, line).await
    }

    pub(crate) fn store(&self) -> &Store {
        &self.store
    }

    pub(crate) fn session_id(&self) -> i64 {
        self.session_id
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub(crate) fn tools(&self) -> &ToolCatalog {
        &self.tools
    }

    pub(crate) fn policy(&self) -> &ToolPolicy {
        &self.policy
    }

    pub(crate) fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    pub(crate) fn session_mut(&mut self, uuid: &str) -> &mut AgentSession {
        self.agents.get_mut(uuid).expect("agent exists")
    }

    pub(crate) fn toolset_of(&self, uuid: &str) -> Vec<String> {
        self.agents[uuid].toolset_filter.clone()
    }

    pub(crate) fn emit_public(&mut self, text: impl Into<String>) {
        self.emit(text);
    }
}

/// Every running or dead descendant of `uuid`, breadth-first, not including
/// `uuid` itself.
async fn collect_descendants(store: &Store, uuid: &str) -> anyhow::Result<Vec<String>> {
    let mut out = Vec::new();
    let mut frontier = vec![uuid.to_string()];
    while let Some(current) = frontier.pop() {
        for child in store.registry.find_children(&current).await? {
            out.push(child.uuid.clone());
            frontier.push(child.uuid);
        }
    }
    Ok(out)
}

/// Dead descendants of `uuid` (plus `uuid` itself if dead) eligible for
/// in-memory reclamation by `/reap` with no target.
async fn dead_and_tainted_agents(store: &Store, uuid: &str) -> anyhow::Result<Vec<String>> {
    let mut candidates = collect_descendants(store, uuid).await?;
    candidates.push(uuid.to_string());
    let mut dead = Vec::new();
    for candidate in candidates {
        if let Some(row) = store.registry.get(&candidate).await? {
            if row.status == AgentStatus::Dead {
                dead.push(candidate);
            }
        }
    }
    Ok(dead)
}

/// When the focused agent is killed, fall back to the first surviving agent
/// already loaded in memory, else the session's root agent (replaying it if
/// needed).
async fn first_surviving_root(
    store: &Store,
    session_id: i64,
    agents: &HashMap<String, AgentSession>,
) -> anyhow::Result<String> {
    for row in store.registry.list_all(session_id).await? {
        if row.status == AgentStatus::Running && agents.contains_key(&row.uuid) {
            return Ok(row.uuid);
        }
    }
    for row in store.registry.list_all(session_id).await? {
        if row.status == AgentStatus::Running {
            return Ok(row.uuid);
        }
    }
    anyhow::bail!("no surviving agent left in this session")
}

/// Resolve the provider/model that should apply after `replay()`, which
/// always leaves `AgentSession::provider`/`model` as empty strings: prefer
/// the most recent `/model` command persisted on the agent's own log,
/// falling back to the configured default (`openai` + `config.openai_model`).
async fn restore_model(store: &Store, agent_uuid: &str, config: &Config) -> anyhow::Result<(String, String)> {
    if let Some(data) = store.events.find_most_recent_command(agent_uuid, "model").await? {
        let provider = data.get("provider").and_then(|v| v.as_str()).map(str::to_string);
        let model = data.get("model").and_then(|v| v.as_str()).map(str::to_string);
        if let (Some(provider), Some(model)) = (provider, model) {
            return Ok((provider, model));
        }
    }
    Ok(("openai".to_string(), config.openai_model.clone()))
}

/// Resolve the system prompt for `agent_uuid`: the most recent `/system`
/// event on its log, else the configured default.
async fn restore_system_prompt(store: &Store, agent_uuid: &str, config: &Config) -> anyhow::Result<Option<String>> {
    let last_id = store.events.find_last_by_kind(agent_uuid, EventKind::System, None).await?;
    if last_id == 0 {
        return Ok(config.openai_system_message.clone());
    }
    let events = store
        .events
        .query_range(agent_uuid, Range { start_id_exclusive: last_id - 1, end_id_inclusive: Some(last_id) })
        .await?;
    Ok(events.into_iter().find(|e| e.id == last_id).and_then(|e| e.content).or_else(|| config.openai_system_message.clone()))
}

/// Generate a short, URL-safe identifier for a new agent.
pub fn new_agent_uuid() -> String {
    let bytes = uuid::Uuid::new_v4();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes.as_bytes())
}

fn short_uuid(uuid: &str) -> &str {
    &uuid[..uuid.len().min(8)]
}

/// Split a command line (with the leading `/` already stripped) into its
/// name and whitespace-separated arguments, honoring `"..."` quoting the
/// same way the REPL Core's own `parser::tokenise` does for incremental
/// input. `ikigai_tui::parse`/`ParsedCommand` drive tab-completion over a
/// partially-typed line and aren't reachable here (`commands` is a private
/// module at the crate root) — full, Enter-committed lines need only this
/// simpler split.
fn tokenise(rest: &str) -> (String, Vec<String>) {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = rest.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    let name = tokens.first().cloned().unwrap_or_default();
    let args = tokens.into_iter().skip(1).collect();
    (name, args)
}

