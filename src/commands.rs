//! Command handlers for the `deluge-remote` binary.

use crate::cli::{AddArgs, Cli, Commands, EditArgs};
use crate::settings::SettingsStore;
use crate::views::add_client::{AddClientForm, FormEvent};
use crate::views::client_list::{ClientList, ListError};
use crate::views::custom_headers::HeaderList;

use anyhow::{Context, Result, bail};
use deluge_core::ClientConfig;
use deluge_core::client::{ConnectionValidator, DelugeValidator};
use parking_lot::Mutex;
use std::sync::Arc;

/// Shared state for one command invocation.
struct Session {
    store: SettingsStore,
    validator: Arc<dyn ConnectionValidator>,
    runtime: tokio::runtime::Runtime,
}

impl Session {
    fn new(store: SettingsStore, validator: Arc<dyn ConnectionValidator>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .thread_name("remote-client")
            .build()
            .context("Failed to create tokio runtime for remote client")?;
        Ok(Self {
            store,
            validator,
            runtime,
        })
    }

    fn saved_clients(&self) -> ClientList {
        ClientList::new(self.store.load().clients)
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let store = match cli.config {
        Some(dir) => SettingsStore::new(dir),
        None => SettingsStore::from_env(),
    };
    log::debug!("Using settings file {}", store.settings_path().display());

    let timeout = store.load().request_timeout();
    let session = Session::new(store, Arc::new(DelugeValidator::new(timeout)))?;

    match cli.command {
        Commands::List => list(&session),
        Commands::Add(args) => add(&session, args),
        Commands::Edit(args) => edit(&session, args),
        Commands::Remove { nickname } => remove(&session, &nickname),
        Commands::Test { nickname } => test(&session, &nickname),
    }
}

fn list(session: &Session) -> Result<()> {
    let saved = session.saved_clients();
    if saved.clients().is_empty() {
        println!("No saved clients.");
        return Ok(());
    }
    for client in saved.clients() {
        println!("{}\t{}", client.nickname(), client.url());
        // Same order the edit form uses, so positions work with --edit-header.
        let headers = HeaderList::from_headers(client.custom_headers());
        for (index, (name, _)) in headers.entries().iter().enumerate() {
            println!("\t[{}] {}", index, name);
        }
    }
    Ok(())
}

fn add(session: &Session, args: AddArgs) -> Result<()> {
    let (mut form, events) =
        AddClientForm::new(session.validator.clone(), session.runtime.handle().clone());
    form.set_nickname(args.nickname);
    form.set_hostname(args.host);
    form.set_relative_path(args.path);
    form.set_port(args.port);
    form.set_password(args.password);
    form.set_ssl_enabled(!args.http);
    for (name, value) in args.headers {
        form.add_header(name, value);
    }

    // Equal configs share a nickname, so the candidate's name identifies the saved entry.
    let candidate = form.validate()?;
    if session.saved_clients().contains(&candidate) {
        bail!(ListError::Duplicate(candidate.nickname().to_string()));
    }

    let config = run_connection_test(session, form, events)?;
    persist(session, |list| list.add(config.clone()))?;
    println!("Saved {} ({})", config.nickname(), config.url());
    Ok(())
}

fn edit(session: &Session, args: EditArgs) -> Result<()> {
    let original = find_saved(session, &args.nickname)?;
    let (mut form, events) = AddClientForm::for_edit(
        original.clone(),
        session.validator.clone(),
        session.runtime.handle().clone(),
    );

    if let Some(nickname) = args.rename {
        form.set_nickname(nickname);
    }
    if let Some(host) = args.host {
        form.set_hostname(host);
    }
    if let Some(path) = args.path {
        form.set_relative_path(path);
    }
    if let Some(port) = args.port {
        form.set_port(port);
    }
    if let Some(password) = args.password {
        form.set_password(password);
    }
    if args.http {
        form.set_ssl_enabled(false);
    } else if args.https {
        form.set_ssl_enabled(true);
    }

    // Header changes apply in a fixed order: clear, edit and delete by
    // position, remove by name, then add.
    if args.clear_headers {
        form.clear_headers();
    }
    for (index, (name, value)) in args.edit_headers {
        if !form.edit_header(index, name, value) {
            bail!("{:?} has no header at position {}", original.nickname(), index);
        }
    }
    let mut positions = args.delete_headers;
    positions.sort_unstable_by(|a, b| b.cmp(a));
    positions.dedup();
    for index in positions {
        if form.remove_header(index).is_none() {
            bail!("{:?} has no header at position {}", original.nickname(), index);
        }
    }
    for name in &args.remove_headers {
        if form.remove_headers_named(name) == 0 {
            log::warn!("No header named {:?} on {:?}", name, original.nickname());
        }
    }
    for (name, value) in args.headers {
        form.add_header(name, value);
    }

    log::debug!(
        "{} {:?}: https {}, {} headers",
        form.title(),
        original.nickname(),
        form.ssl_enabled(),
        form.headers().len()
    );

    let edited = run_connection_test(session, form, events)?;
    persist(session, |list| list.replace(&original, edited.clone()))?;
    println!("Updated {} ({})", edited.nickname(), edited.url());
    Ok(())
}

fn remove(session: &Session, nickname: &str) -> Result<()> {
    let mut removed = Vec::new();
    persist(session, |list| {
        removed = list.remove(nickname)?;
        Ok(())
    })?;
    for client in removed {
        println!("Removed {} ({})", client.nickname(), client.url());
    }
    Ok(())
}

fn test(session: &Session, nickname: &str) -> Result<()> {
    let saved = find_saved(session, nickname)?;
    let (form, events) = AddClientForm::for_edit(
        saved,
        session.validator.clone(),
        session.runtime.handle().clone(),
    );
    let config = run_connection_test(session, form, events)?;
    log::info!("Client {:?} at {} is reachable", config.nickname(), config.url());
    Ok(())
}

fn find_saved(session: &Session, nickname: &str) -> Result<ClientConfig> {
    session
        .saved_clients()
        .find(nickname)
        .cloned()
        .ok_or_else(|| ListError::NotFound(nickname.to_string()).into())
}

/// Start the form's connection test and wait for its outcome.
///
/// The returned config is the one the form accepted, not the event payload.
fn run_connection_test(
    session: &Session,
    form: AddClientForm,
    events: async_channel::Receiver<FormEvent>,
) -> Result<ClientConfig> {
    let form = Arc::new(Mutex::new(form));
    AddClientForm::test_connection(&form)?;
    println!("{}", form.lock().status().label());

    let event = session
        .runtime
        .block_on(events.recv())
        .context("Connection test ended without a result")?;

    match event {
        FormEvent::Accepted(tested) => {
            let form = form.lock();
            let accepted = form
                .done()
                .context("Connection test passed but the form has no accepted config")?;
            log::debug!("Accepted {:?} at {}", tested.nickname(), tested.url());
            println!("{}", form.status().label());
            Ok(accepted)
        }
        FormEvent::Failed(message) => bail!("Connection failure: {}", message),
    }
}

/// Apply a list operation to the saved clients under the settings lock.
fn persist<F>(session: &Session, op: F) -> Result<()>
where
    F: FnOnce(&mut ClientList) -> Result<(), ListError>,
{
    let mut outcome = Ok(());
    session.store.update_clients(|clients| {
        let mut list = ClientList::new(std::mem::take(clients));
        outcome = op(&mut list);
        *clients = list.into_inner();
    })?;
    outcome.map_err(Into::into)
}
