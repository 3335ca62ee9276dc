use crate::budget::calendar::{CalendarEvent, CalendarSink, IcsExporter};
use crate::budget::{next_due, upcoming_deduction, BudgetSummary};
use crate::cache::{has_version, AssetCacheManager, SqliteStorage};
use crate::commands::{BudgetCommand, Command, ExpenseCommand};
use crate::config::Config;
use crate::lifecycle::Lifecycle;
use crate::net::{HttpFetcher, Request, RequestMode};
use crate::notify::{ClickOutcome, Dispatcher, Permission, TerminalHost};
use crate::router::{RouteContext, Router};
use crate::store::{weekday_name, ExpenseInput, ExpenseStore, RecordId};
use chrono::Local;
use color_eyre::{eyre::eyre, Result};
use reqwest::Method;
use std::io::Write;
use tracing::{info, warn};

/// Everything a command needs, opened once and passed around explicitly.
pub struct App {
  config: Config,
  store: ExpenseStore,
  cache: AssetCacheManager<SqliteStorage>,
  fetcher: HttpFetcher,
  router: Router<SqliteStorage, HttpFetcher>,
  dispatcher: Dispatcher<TerminalHost>,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let db_path = config.database_path()?;
    let store = ExpenseStore::open(&db_path)?;

    let storage = SqliteStorage::open(&db_path)?;
    let cache = AssetCacheManager::new(storage, &config.cache.prefix, &config.cache.version);

    let fetcher = HttpFetcher::new(config.origin.clone())?;
    let ctx = RouteContext {
      app_shell: config.app_shell_url()?,
      tracking_hosts: config.cache.tracking_hosts.clone(),
      asset_hosts: config.cache.third_party_origins.clone(),
    };
    let router = Router::new(cache.clone(), fetcher.clone(), ctx);

    let dispatcher = Dispatcher::new(
      TerminalHost::new(config.notifications.enabled),
      config.origin.clone(),
    );

    Ok(Self {
      config,
      store,
      cache,
      fetcher,
      router,
      dispatcher,
    })
  }

  pub async fn run(&self, command: Command) -> Result<()> {
    match command {
      Command::Install => self.install().await,
      Command::Fetch {
        url,
        method,
        html,
        body,
        data,
      } => self.fetch(&url, &method, html, body, data).await,
      Command::Caches => self.caches(),
      Command::Expense(cmd) => self.expense(cmd),
      Command::Budget(cmd) => self.budget(cmd),
      Command::Upcoming => self.upcoming(),
      Command::Push { payload } => {
        self.dispatcher.on_push(payload.as_bytes());
        Ok(())
      }
      Command::Click { action, url } => {
        match self
          .dispatcher
          .on_notification_click(action.as_deref(), url.as_deref())
        {
          ClickOutcome::Failed => Err(eyre!("Could not focus or open a window")),
          _ => Ok(()),
        }
      }
    }
  }

  async fn install(&self) -> Result<()> {
    let mut lifecycle = Lifecycle::new(
      self.cache.clone(),
      self.fetcher.clone(),
      self.config.origin.clone(),
      self.config.manifest_urls()?,
      self.config.cache.third_party_assets.clone(),
    );

    let installed = lifecycle.install().await?;
    info!(state = ?lifecycle.state(), "install finished");
    println!(
      "installed {}: {} assets cached, {} local and {} third-party failures",
      self.cache.version(),
      installed.manifest.stored + installed.third_party.stored,
      installed.manifest.failed_same_origin.len(),
      installed.manifest.failed_cross_origin.len() + installed.third_party.failed(),
    );
    for url in &installed.manifest.failed_same_origin {
      println!("  missing {}", url);
    }

    if !lifecycle.skip_waiting() {
      println!("waiting for open pages to close before activating");
      return Ok(());
    }

    let activated = lifecycle.activate(self.dispatcher.host())?;
    println!(
      "activated {}: {} stale caches removed, {} windows claimed",
      self.cache.version(),
      activated.pruned.len(),
      activated.claimed,
    );
    info!(state = ?lifecycle.state(), "activation finished");
    Ok(())
  }

  async fn fetch(
    &self,
    url: &str,
    method: &str,
    html: bool,
    print_body: bool,
    data: Option<String>,
  ) -> Result<()> {
    let url = self
      .config
      .origin
      .join(url)
      .map_err(|e| eyre!("Invalid URL '{}': {}", url, e))?;
    let method = Method::from_bytes(method.to_uppercase().as_bytes())
      .map_err(|e| eyre!("Invalid method '{}': {}", method, e))?;

    let mut request = Request::new(method, url);
    if let Some(data) = data {
      request = request.with_body(data.into_bytes());
    }
    if html {
      request = request
        .with_header("accept", "text/html,application/xhtml+xml")
        .with_mode(RequestMode::Navigate);
    } else if request.url.origin() != self.config.origin.origin() {
      request = request.with_mode(RequestMode::NoCors);
    }

    let routed = self.router.handle(request).await;
    println!(
      "{} {} via {} ({} bytes, {}, {})",
      routed.response.status,
      routed.rule,
      routed.source.as_str(),
      routed.response.body.len(),
      routed.response.kind.as_str(),
      routed.response.header("content-type").unwrap_or("no content-type"),
    );
    if let Some(cached_at) = routed.cached_at {
      let age = chrono::Utc::now() - cached_at;
      println!("cached {} ({}m ago)", cached_at.format("%Y-%m-%d %H:%M:%S"), age.num_minutes());
    }

    if print_body {
      std::io::stdout().write_all(&routed.response.body)?;
    }

    // The process is about to exit; let the refresh land in the cache.
    if let Some(refresh) = routed.revalidation {
      if let Err(e) = refresh.await {
        warn!(error = %e, "background refresh did not finish");
      }
    }
    Ok(())
  }

  fn caches(&self) -> Result<()> {
    for (name, count) in self.cache.inventory()? {
      let marker = if has_version(&name, self.cache.version()) {
        "*"
      } else {
        " "
      };
      println!("{} {:<40} {:>6}", marker, name, count);
    }
    Ok(())
  }

  fn expense(&self, command: ExpenseCommand) -> Result<()> {
    match command {
      ExpenseCommand::Add {
        name,
        amount,
        frequency,
        day,
      } => {
        let id = self.store.add(&ExpenseInput {
          name,
          amount,
          frequency,
          day,
        })?;
        println!("added expense #{}", id);
        self.sync_calendar(id);
        Ok(())
      }
      ExpenseCommand::List => {
        let today = Local::now().date_naive();
        for record in self.store.list()? {
          println!(
            "#{:<4} {:<24} {:>10.2} {:<12} {:<10} next {}",
            record.id,
            record.name,
            record.amount,
            record.frequency,
            weekday_name(record.day),
            next_due(&record, today)
          );
        }
        Ok(())
      }
      ExpenseCommand::Remove { id } => {
        self.store.remove(id)?;
        if self.config.calendar.enabled {
          if let Err(e) = self.exporter().and_then(|x| x.withdraw(id)) {
            warn!(id, error = %e, "failed to remove calendar event");
          }
        }
        println!("removed expense #{}", id);
        Ok(())
      }
    }
  }

  /// Hand a new expense to the calendar. Failures are only logged.
  fn sync_calendar(&self, id: RecordId) {
    if !self.config.calendar.enabled {
      return;
    }

    let record = match self.store.list() {
      Ok(records) => records.into_iter().find(|r| r.id == id),
      Err(e) => {
        warn!(id, error = %e, "cannot load expense for calendar");
        return;
      }
    };
    let Some(record) = record else {
      return;
    };

    let event = CalendarEvent::for_expense(&record, Local::now().date_naive());
    match self.exporter().and_then(|x| x.publish(id, &event)) {
      Ok(()) => info!(id, rule = %event.recurrence_rule, "calendar event published"),
      Err(e) => warn!(id, error = %e, "calendar sync failed"),
    }
  }

  fn exporter(&self) -> Result<IcsExporter> {
    Ok(IcsExporter::new(self.config.calendar_dir()?))
  }

  fn budget(&self, command: BudgetCommand) -> Result<()> {
    match command {
      BudgetCommand::Set { amount } => {
        self.store.set_budget(amount)?;
        println!("budget set to ${:.2}", amount);
      }
      BudgetCommand::Show => {
        let summary = BudgetSummary::compute(self.store.budget()?, &self.store.list()?);
        match summary.budget {
          Some(budget) => println!("budget:     ${:.2}", budget),
          None => println!("budget:     not set"),
        }
        println!("per month:  ${:.2}", summary.monthly_total);
        if let Some(remaining) = summary.remaining {
          println!("remaining:  ${:.2}", remaining);
        }
        if let Some(percent) = summary.percent_used {
          println!("used:       {}%", percent);
        }
        if summary.is_over_budget() {
          println!("over budget!");
        }
      }
    }
    Ok(())
  }

  fn upcoming(&self) -> Result<()> {
    let today = Local::now().date_naive();
    let Some(deduction) = upcoming_deduction(&self.store.list()?, today) else {
      println!("no expenses recorded");
      return Ok(());
    };

    println!(
      "next: {} ${:.2} on {}",
      deduction.name, deduction.amount, deduction.due_date
    );

    if self.dispatcher.request_permission() == Permission::Denied {
      info!("reminders disabled");
      return Ok(());
    }
    self.dispatcher.notify_upcoming(&deduction);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::Frequency;
  use chrono::Weekday;
  use rust_decimal::Decimal;

  /// App whose calendar export directory is actually a regular file.
  fn app_with_broken_calendar(dir: &std::path::Path) -> App {
    let blocker = dir.join("not-a-dir");
    std::fs::write(&blocker, b"").unwrap();

    let yaml = format!(
      "origin: https://budget.example/\n\
       database: '{}'\n\
       calendar:\n  enabled: true\n  export_dir: '{}'\n",
      dir.join("budget.db").display(),
      blocker.display(),
    );
    App::new(Config::parse(&yaml).unwrap()).unwrap()
  }

  #[tokio::test]
  async fn test_calendar_failure_does_not_block_add() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with_broken_calendar(dir.path());

    app
      .run(Command::Expense(ExpenseCommand::Add {
        name: "Rent".to_string(),
        amount: Decimal::new(45000, 2),
        frequency: Frequency::Fortnightly,
        day: Weekday::Thu,
      }))
      .await
      .unwrap();

    let records = app.store.list().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Rent");
  }

  #[tokio::test]
  async fn test_calendar_failure_does_not_block_remove() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with_broken_calendar(dir.path());
    let id = app
      .store
      .add(&ExpenseInput {
        name: "Gym".to_string(),
        amount: Decimal::new(1995, 2),
        frequency: Frequency::Weekly,
        day: Weekday::Mon,
      })
      .unwrap();

    app
      .run(Command::Expense(ExpenseCommand::Remove { id }))
      .await
      .unwrap();

    assert!(app.store.list().unwrap().is_empty());
  }
}
