pub mod types;

use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use iced::alignment::Horizontal;
use iced::event::{self, Event};
use iced::theme;
use iced::widget::{
    button, checkbox, column, container, pick_list, row, scrollable, text, text_input,
};
use iced::{Alignment, Application, Color, Command, Element, Length, Subscription, Theme};

use fichedesk_core::{
    ledger, tarifs, targets, workflow, AppConfig, AuthClient, AuthSession, Error, Fiche, Payment,
    SearchOutcome, Store,
};

use crate::logging::{apply_log_level, LogEntry, LogLevel, LogStore, ReloadHandle};
use crate::{printout, qr};

pub use types::{ErrorInfo, FicheField, Flags, Message, Screen, Tab};

pub struct FicheDeskApp {
    log_store: LogStore,
    reload_handle: ReloadHandle,
    log_entries: Vec<LogEntry>,
    log_level: LogLevel,
    known_targets: HashSet<String>,
    enabled_targets: HashSet<String>,
    copy_status: Option<String>,
    active_tab: Tab,
    screen: Screen,
    config: AppConfig,
    store: Arc<dyn Store>,
    auth: Arc<dyn AuthClient>,
    session: Option<AuthSession>,
    idle_seconds: u64,
    login_email: String,
    login_password: String,
    login_status: Option<String>,
    login_in_flight: bool,
    search_query: String,
    search_status: Option<String>,
    search_in_flight: bool,
    fiche: Fiche,
    payments: Vec<Payment>,
    fiche_status: Option<String>,
    save_in_flight: bool,
    sequence_in_flight: bool,
    payment_amount: String,
    payment_reference: String,
    payment_status: Option<String>,
    payment_in_flight: bool,
    delete_prompt_open: bool,
    delete_email: String,
    delete_password: String,
    delete_status: Option<String>,
    delete_in_flight: bool,
    printout_path: String,
    printout_status: Option<String>,
}

impl Application for FicheDeskApp {
    type Executor = crate::executor::StackSizedTokioExecutor;
    type Message = Message;
    type Theme = Theme;
    type Flags = Flags;

    fn new(flags: Flags) -> (Self, Command<Message>) {
        let default_targets = [
            targets::UI,
            targets::STORE,
            targets::AUTH,
            targets::WORKFLOW,
            targets::CONFIG,
        ];
        let known_targets: HashSet<String> = default_targets
            .iter()
            .map(|value| value.to_string())
            .collect();
        let enabled_targets = known_targets.clone();

        (
            Self {
                log_store: flags.log_store,
                reload_handle: flags.reload_handle,
                log_entries: Vec::new(),
                log_level: LogLevel::default(),
                known_targets,
                enabled_targets,
                copy_status: None,
                active_tab: Tab::Fiche,
                screen: Screen::Login,
                config: flags.config,
                store: flags.store,
                auth: flags.auth,
                session: None,
                idle_seconds: 0,
                login_email: String::new(),
                login_password: String::new(),
                login_status: None,
                login_in_flight: false,
                search_query: String::new(),
                search_status: None,
                search_in_flight: false,
                fiche: Fiche::new(String::new()),
                payments: Vec::new(),
                fiche_status: None,
                save_in_flight: false,
                sequence_in_flight: false,
                payment_amount: String::new(),
                payment_reference: String::new(),
                payment_status: None,
                payment_in_flight: false,
                delete_prompt_open: false,
                delete_email: String::new(),
                delete_password: String::new(),
                delete_status: None,
                delete_in_flight: false,
                printout_path: "fiche.txt".to_string(),
                printout_status: None,
            },
            Command::none(),
        )
    }

    fn title(&self) -> String {
        "FicheDesk".to_string()
    }

    fn update(&mut self, message: Message) -> Command<Message> {
        match message {
            Message::LogTick => {
                self.refresh_logs();
                Command::none()
            }
            Message::LogLevelChanged(level) => {
                self.log_level = level;
                apply_log_level(&self.reload_handle, level);
                tracing::info!(target: targets::UI, "Log level set to {}", level);
                Command::none()
            }
            Message::ToggleTarget(target, enabled) => {
                if enabled {
                    self.enabled_targets.insert(target);
                } else {
                    self.enabled_targets.remove(&target);
                }
                Command::none()
            }
            Message::CopyDiagnostics => {
                self.copy_status = Some(self.copy_diagnostics());
                Command::none()
            }
            Message::SelectTab(tab) => {
                self.active_tab = tab;
                Command::none()
            }
            Message::LoginEmailChanged(value) => {
                self.login_email = value;
                Command::none()
            }
            Message::LoginPasswordChanged(value) => {
                self.login_password = value;
                Command::none()
            }
            Message::SubmitLogin => self.submit_login(),
            Message::LoginFinished(result) => self.handle_login_finished(result),
            Message::ActivityDetected => {
                self.idle_seconds = 0;
                Command::none()
            }
            Message::InactivityTick => {
                if self.session.is_none() {
                    return Command::none();
                }
                self.idle_seconds = self.idle_seconds.saturating_add(1);
                if self.idle_seconds >= self.config.inactivity_timeout_secs {
                    tracing::info!(
                        target: targets::UI,
                        idle_secs = self.idle_seconds,
                        "Session closed after inactivity"
                    );
                    return self.close_session();
                }
                Command::none()
            }
            Message::Logout => self.close_session(),
            Message::SessionClosed => Command::none(),
            Message::SearchQueryChanged(value) => {
                self.search_query = value;
                Command::none()
            }
            Message::SubmitSearch => self.submit_search(),
            Message::SearchFinished(result) => {
                self.search_in_flight = false;
                match result {
                    Ok(SearchOutcome::NotFound) => {
                        // The active editing session stays untouched.
                        self.search_status = Some("No subscriber matched.".to_string());
                    }
                    Ok(SearchOutcome::Found {
                        fiche,
                        payments,
                        candidates,
                    }) => {
                        self.search_status = if candidates > 1 {
                            Some(format!(
                                "{candidates} records matched; showing fiche {}. \
                                 Search the exact fiche number to narrow down.",
                                fiche.sequence
                            ))
                        } else {
                            Some(format!("Loaded fiche {}.", fiche.sequence))
                        };
                        self.load_session(fiche, payments);
                    }
                    Err(error) => {
                        tracing::warn!(target: targets::UI, detail = %error.detail, "Search failed");
                        self.search_status = Some(error.summary);
                    }
                }
                Command::none()
            }
            Message::NewFiche => self.start_new_fiche(),
            Message::SequenceAssigned(result) => {
                self.sequence_in_flight = false;
                match result {
                    Ok(sequence) => {
                        self.fiche_status = Some(format!("New fiche {sequence}."));
                        self.fiche = Fiche::new(sequence);
                        self.payments.clear();
                        self.payment_status = None;
                        self.delete_prompt_open = false;
                    }
                    Err(error) => {
                        tracing::warn!(
                            target: targets::UI,
                            detail = %error.detail,
                            "Fiche number assignment failed"
                        );
                        self.fiche_status = Some(error.summary);
                    }
                }
                Command::none()
            }
            Message::FieldEdited(field, value) => {
                field.apply(&mut self.fiche, value);
                Command::none()
            }
            Message::SiteSelected(site) => {
                if self.fiche.site != site {
                    self.fiche.site = site;
                    // The old dimension may not exist on the new site.
                    self.fiche.dimension = String::new();
                }
                Command::none()
            }
            Message::DimensionSelected(dimension) => {
                self.fiche.dimension = dimension;
                Command::none()
            }
            Message::SaveFiche => self.submit_save(),
            Message::FicheSaved(result) => {
                self.save_in_flight = false;
                match result {
                    Ok(fiche) => {
                        self.fiche_status = Some(format!("Fiche {} saved.", fiche.sequence));
                        self.fiche = fiche;
                    }
                    Err(error) => {
                        tracing::warn!(target: targets::UI, detail = %error.detail, "Save failed");
                        self.fiche_status = Some(error.summary);
                    }
                }
                Command::none()
            }
            Message::PaymentAmountChanged(value) => {
                self.payment_amount = value;
                Command::none()
            }
            Message::PaymentReferenceChanged(value) => {
                self.payment_reference = value;
                Command::none()
            }
            Message::SubmitPayment => self.submit_payment(),
            Message::PaymentRecorded(result) => {
                self.payment_in_flight = false;
                match result {
                    Ok(()) => {
                        self.payment_status = Some("Payment recorded.".to_string());
                        self.payment_amount.clear();
                        self.payment_reference.clear();
                        self.refresh_session()
                    }
                    Err(error) => {
                        tracing::warn!(
                            target: targets::UI,
                            detail = %error.detail,
                            "Payment rejected"
                        );
                        self.payment_status = Some(error.summary);
                        Command::none()
                    }
                }
            }
            Message::SessionRefreshed(result) => {
                match result {
                    Ok(SearchOutcome::Found {
                        fiche, payments, ..
                    }) => {
                        self.fiche = fiche;
                        self.payments = payments;
                    }
                    Ok(SearchOutcome::NotFound) => {
                        // The record disappeared under us; the reload doubles
                        // as an existence check.
                        self.fiche_status =
                            Some("Fiche no longer exists in the store.".to_string());
                    }
                    Err(error) => {
                        tracing::warn!(
                            target: targets::UI,
                            detail = %error.detail,
                            "Session refresh failed"
                        );
                        self.payment_status = Some(error.summary);
                    }
                }
                Command::none()
            }
            Message::RequestDelete => {
                if self.fiche.is_persisted() {
                    self.delete_prompt_open = true;
                    self.delete_status = None;
                } else {
                    let error = Error::NotPersisted {
                        operation: "deleting it",
                    };
                    self.fiche_status = Some(error.user_summary());
                }
                Command::none()
            }
            Message::CancelDelete => {
                self.delete_prompt_open = false;
                self.delete_email.clear();
                self.delete_password.clear();
                self.delete_status = None;
                Command::none()
            }
            Message::DeleteEmailChanged(value) => {
                self.delete_email = value;
                Command::none()
            }
            Message::DeletePasswordChanged(value) => {
                self.delete_password = value;
                Command::none()
            }
            Message::ConfirmDelete => self.submit_delete(),
            Message::DeleteFinished(result) => {
                self.delete_in_flight = false;
                match result {
                    Ok(()) => {
                        self.delete_prompt_open = false;
                        self.delete_email.clear();
                        self.delete_password.clear();
                        self.delete_status = None;
                        self.fiche_status = Some("Fiche deleted.".to_string());
                        self.start_new_fiche()
                    }
                    Err(error) => {
                        tracing::warn!(
                            target: targets::UI,
                            detail = %error.detail,
                            "Deletion refused"
                        );
                        self.delete_status = Some(error.summary);
                        Command::none()
                    }
                }
            }
            Message::PrintoutPathChanged(value) => {
                self.printout_path = value;
                Command::none()
            }
            Message::ExportPrintout => {
                self.export_printout();
                Command::none()
            }
        }
    }

    fn subscription(&self) -> Subscription<Message> {
        let log_tick = iced::time::every(Duration::from_millis(250)).map(|_| Message::LogTick);
        if self.session.is_none() {
            // No inactivity timer without a session.
            return log_tick;
        }

        let inactivity =
            iced::time::every(Duration::from_secs(1)).map(|_| Message::InactivityTick);
        let activity = event::listen_with(activity_event);
        Subscription::batch(vec![log_tick, inactivity, activity])
    }

    fn view(&self) -> Element<'_, Message> {
        let header = row![
            text("FicheDesk")
                .size(28)
                .style(theme::Text::Color(Color::from_rgb8(0x10, 0x1a, 0x24))),
            text("souscriptions logement")
                .size(16)
                .style(theme::Text::Color(Color::from_rgb8(0x5f, 0x6b, 0x7a))),
        ]
        .spacing(12)
        .align_items(Alignment::Center);

        let tabs = self.tab_bar();

        let body = match self.active_tab {
            Tab::Fiche => match self.screen {
                Screen::Login => self.login_view(),
                Screen::Workspace => self.workspace_view(),
            },
            Tab::Debug => self.debug_tab_view(),
        };

        let content = column![header, tabs, body].spacing(20).padding(16);

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }
}

impl FicheDeskApp {
    fn refresh_logs(&mut self) {
        let entries = self.log_store.snapshot();
        for entry in &entries {
            if self.known_targets.insert(entry.target.clone()) {
                self.enabled_targets.insert(entry.target.clone());
            }
        }
        self.log_entries = entries;
    }

    fn submit_login(&mut self) -> Command<Message> {
        if self.login_in_flight {
            return Command::none();
        }
        let email = self.login_email.trim().to_string();
        let password = self.login_password.clone();
        if email.is_empty() || password.is_empty() {
            self.login_status = Some("Enter email and password.".to_string());
            return Command::none();
        }

        self.login_in_flight = true;
        self.login_status = Some("Signing in...".to_string());
        let auth = self.auth.clone();
        Command::perform(
            async move {
                auth.sign_in(email, password)
                    .await
                    .map_err(|error| ErrorInfo::from_error(&error))
            },
            Message::LoginFinished,
        )
    }

    fn handle_login_finished(
        &mut self,
        result: Result<AuthSession, ErrorInfo>,
    ) -> Command<Message> {
        self.login_in_flight = false;
        match result {
            Ok(session) => {
                tracing::info!(target: targets::UI, email = %session.email, "Signed in");
                self.store
                    .set_access_token(Some(session.access_token.clone()));
                self.session = Some(session);
                self.screen = Screen::Workspace;
                self.idle_seconds = 0;
                self.login_password.clear();
                self.login_status = None;
                self.start_new_fiche()
            }
            Err(error) => {
                tracing::warn!(target: targets::UI, detail = %error.detail, "Sign-in failed");
                self.login_status = Some(error.summary);
                Command::none()
            }
        }
    }

    fn close_session(&mut self) -> Command<Message> {
        self.store.set_access_token(None);
        let session = self.session.take();
        self.reset_workspace();
        self.screen = Screen::Login;
        self.idle_seconds = 0;

        if let Some(session) = session {
            tracing::info!(target: targets::UI, email = %session.email, "Signed out");
            let auth = self.auth.clone();
            return Command::perform(
                async move {
                    // Best effort; the local session is already gone.
                    let _ = auth.sign_out(session.access_token).await;
                },
                |_| Message::SessionClosed,
            );
        }
        Command::none()
    }

    fn reset_workspace(&mut self) {
        self.fiche = Fiche::new(String::new());
        self.payments.clear();
        self.search_query.clear();
        self.search_status = None;
        self.fiche_status = None;
        self.payment_amount.clear();
        self.payment_reference.clear();
        self.payment_status = None;
        self.delete_prompt_open = false;
        self.delete_email.clear();
        self.delete_password.clear();
        self.delete_status = None;
        self.printout_status = None;
        self.save_in_flight = false;
        self.search_in_flight = false;
        self.payment_in_flight = false;
        self.delete_in_flight = false;
        self.sequence_in_flight = false;
    }

    fn load_session(&mut self, fiche: Fiche, payments: Vec<Payment>) {
        self.fiche = fiche;
        self.payments = payments;
        self.fiche_status = None;
        self.payment_status = None;
        self.delete_prompt_open = false;
        self.delete_status = None;
    }

    fn start_new_fiche(&mut self) -> Command<Message> {
        if self.sequence_in_flight {
            return Command::none();
        }
        self.sequence_in_flight = true;
        let store = self.store.clone();
        Command::perform(
            async move {
                workflow::next_sequence_number(store.as_ref())
                    .await
                    .map_err(|error| ErrorInfo::from_error(&error))
            },
            Message::SequenceAssigned,
        )
    }

    fn submit_search(&mut self) -> Command<Message> {
        if self.search_in_flight {
            return Command::none();
        }
        let query = self.search_query.trim().to_string();
        if query.is_empty() {
            self.search_status =
                Some("Enter a fiche number, name, parcel, phone, or email.".to_string());
            return Command::none();
        }

        self.search_in_flight = true;
        self.search_status = Some("Searching...".to_string());
        let store = self.store.clone();
        Command::perform(
            async move {
                workflow::search(store.as_ref(), &query)
                    .await
                    .map_err(|error| ErrorInfo::from_error(&error))
            },
            Message::SearchFinished,
        )
    }

    fn submit_save(&mut self) -> Command<Message> {
        if self.save_in_flight {
            return Command::none();
        }
        self.save_in_flight = true;
        self.fiche_status = Some("Saving...".to_string());
        let store = self.store.clone();
        let fiche = self.fiche.clone();
        Command::perform(
            async move {
                workflow::save(store.as_ref(), fiche)
                    .await
                    .map_err(|error| ErrorInfo::from_error(&error))
            },
            Message::FicheSaved,
        )
    }

    fn submit_payment(&mut self) -> Command<Message> {
        if self.payment_in_flight {
            return Command::none();
        }
        if !self.fiche.is_persisted() {
            let error = Error::NotPersisted {
                operation: "recording payments",
            };
            self.payment_status = Some(error.user_summary());
            return Command::none();
        }

        self.payment_in_flight = true;
        let store = self.store.clone();
        let sequence = self.fiche.sequence.clone();
        let amount = self.payment_amount.clone();
        let reference = self.payment_reference.clone();
        Command::perform(
            async move {
                workflow::add_payment(store.as_ref(), &sequence, &amount, &reference)
                    .await
                    .map_err(|error| ErrorInfo::from_error(&error))
            },
            Message::PaymentRecorded,
        )
    }

    /// Full reload of the active fiche and its ledger by exact fiche number;
    /// also re-confirms the record still exists.
    fn refresh_session(&mut self) -> Command<Message> {
        let store = self.store.clone();
        let sequence = self.fiche.sequence.clone();
        Command::perform(
            async move {
                workflow::search(store.as_ref(), &sequence)
                    .await
                    .map_err(|error| ErrorInfo::from_error(&error))
            },
            Message::SessionRefreshed,
        )
    }

    fn submit_delete(&mut self) -> Command<Message> {
        if self.delete_in_flight {
            return Command::none();
        }
        if self.delete_email.trim().is_empty() || self.delete_password.is_empty() {
            self.delete_status = Some("Enter email and password to confirm.".to_string());
            return Command::none();
        }

        self.delete_in_flight = true;
        self.delete_status = Some("Verifying identity...".to_string());
        let auth = self.auth.clone();
        let store = self.store.clone();
        let authorized = self.config.authorized_deleter.clone();
        let email = self.delete_email.clone();
        let password = self.delete_password.clone();
        let fiche = self.fiche.clone();
        Command::perform(
            async move {
                workflow::delete_fiche(
                    auth.as_ref(),
                    store.as_ref(),
                    &authorized,
                    &email,
                    &password,
                    &fiche,
                )
                .await
                .map_err(|error| ErrorInfo::from_error(&error))
            },
            Message::DeleteFinished,
        )
    }

    fn export_printout(&mut self) {
        if !self.fiche.is_persisted() {
            let error = Error::NotPersisted {
                operation: "printing it",
            };
            self.printout_status = Some(error.user_summary());
            return;
        }
        let path = self.printout_path.trim().to_string();
        if path.is_empty() {
            self.printout_status = Some("Export failed: path is empty.".to_string());
            return;
        }

        let rates = tarifs::resolve(&self.fiche.site, &self.fiche.dimension);
        let balance = ledger::reconcile(&rates, true, &self.payments);
        let document =
            printout::build_document(&self.fiche, &rates, &balance, &self.payments, Utc::now());
        match fs::write(&path, document) {
            Ok(()) => {
                tracing::info!(
                    target: targets::UI,
                    sequence = %self.fiche.sequence,
                    path = %path,
                    "Fiche document exported"
                );
                self.printout_status =
                    Some(format!("Saved fiche {} to {path}.", self.fiche.sequence));
            }
            Err(error) => {
                self.printout_status = Some(format!("Export failed: {error}"));
            }
        }
    }

    fn tab_bar(&self) -> Element<'_, Message> {
        row![
            self.tab_button(Tab::Fiche, "Fiches"),
            self.tab_button(Tab::Debug, "Debug")
        ]
        .spacing(8)
        .align_items(Alignment::Center)
        .into()
    }

    fn tab_button(&self, tab: Tab, label: &str) -> Element<'_, Message> {
        let style = if self.active_tab == tab {
            theme::Button::Primary
        } else {
            theme::Button::Secondary
        };

        button(text(label))
            .style(style)
            .on_press(Message::SelectTab(tab))
            .into()
    }

    fn login_view(&self) -> Element<'_, Message> {
        let email_input = text_input("agent@example.org", &self.login_email)
            .on_input(Message::LoginEmailChanged)
            .on_submit(Message::SubmitLogin)
            .padding(6)
            .size(14)
            .width(Length::Fill);
        let password_input = text_input("Password", &self.login_password)
            .secure(true)
            .on_input(Message::LoginPasswordChanged)
            .on_submit(Message::SubmitLogin)
            .padding(6)
            .size(14)
            .width(Length::Fill);

        let submit = button(text(if self.login_in_flight {
            "Signing in..."
        } else {
            "Sign in"
        }))
        .on_press_maybe((!self.login_in_flight).then_some(Message::SubmitLogin));

        let status = self.login_status.as_deref().unwrap_or("Ready.");

        let content = column![
            text("Sign in")
                .size(20)
                .style(theme::Text::Color(Color::from_rgb8(0x12, 0x12, 0x12))),
            self.field_label("Email"),
            email_input,
            self.field_label("Password"),
            password_input,
            submit,
            text(status)
                .size(12)
                .style(theme::Text::Color(Color::from_rgb8(0x6a, 0x6a, 0x6a))),
        ]
        .spacing(8)
        .max_width(360);

        container(content)
            .padding(16)
            .width(Length::Fill)
            .center_x()
            .style(theme::Container::Box)
            .into()
    }

    fn workspace_view(&self) -> Element<'_, Message> {
        let form = self.form_column();
        let side = self.side_column();

        row![form, side]
            .spacing(16)
            .align_items(Alignment::Start)
            .into()
    }

    fn form_column(&self) -> Element<'_, Message> {
        let fiche_status = self.fiche_status.as_deref().unwrap_or("Ready.");

        let mut content = column![
            self.search_panel(),
            text(format!("Fiche no {}", self.fiche.sequence))
                .size(20)
                .style(theme::Text::Color(Color::from_rgb8(0x12, 0x12, 0x12))),
            self.identity_section(),
            self.address_section(),
            self.parcel_section(),
            self.plan_section(),
            self.actions_row(),
            text(format!("Status: {fiche_status}"))
                .size(12)
                .style(theme::Text::Color(Color::from_rgb8(0x6a, 0x6a, 0x6a))),
        ]
        .spacing(12);

        if self.delete_prompt_open {
            content = content.push(self.delete_prompt());
        }

        let scroll = scrollable(content).height(Length::Fill).width(Length::Fill);

        container(scroll)
            .padding(12)
            .width(Length::FillPortion(2))
            .height(Length::Fill)
            .style(theme::Container::Box)
            .into()
    }

    fn search_panel(&self) -> Element<'_, Message> {
        let query_input = text_input("Fiche no, name, parcel, phone, email", &self.search_query)
            .on_input(Message::SearchQueryChanged)
            .on_submit(Message::SubmitSearch)
            .padding(6)
            .size(12)
            .width(Length::Fill);

        let search_button = button("Search")
            .on_press_maybe((!self.search_in_flight).then_some(Message::SubmitSearch));

        let status = self.search_status.as_deref().unwrap_or("Ready.");

        let content = column![
            row![query_input, search_button]
                .spacing(8)
                .align_items(Alignment::Center),
            text(status)
                .size(12)
                .style(theme::Text::Color(Color::from_rgb8(0x6a, 0x6a, 0x6a))),
        ]
        .spacing(4);

        container(content)
            .padding(8)
            .style(theme::Container::Box)
            .into()
    }

    fn identity_section(&self) -> Element<'_, Message> {
        column![
            self.section_title("Souscripteur"),
            self.labeled_input("Noms", "KABONGO MWAMBA", FicheField::Name),
            row![
                self.labeled_input("Piece d'identite", "", FicheField::NationalId),
                self.labeled_input("Telephone", "+243...", FicheField::Phone),
            ]
            .spacing(8),
            row![
                self.labeled_input("Employeur", "", FicheField::Employer),
                self.labeled_input("Matricule", "", FicheField::EmployeeNumber),
                self.labeled_input("Fonction", "", FicheField::JobTitle),
            ]
            .spacing(8),
            self.labeled_input("Email", "", FicheField::Email),
        ]
        .spacing(6)
        .into()
    }

    fn address_section(&self) -> Element<'_, Message> {
        column![
            self.section_title("Adresse"),
            self.labeled_input("Avenue / no", "", FicheField::StreetAddress),
            row![
                self.labeled_input("Quartier", "", FicheField::Neighborhood),
                self.labeled_input("Commune", "", FicheField::Municipality),
            ]
            .spacing(8),
        ]
        .spacing(6)
        .into()
    }

    fn parcel_section(&self) -> Element<'_, Message> {
        column![
            self.section_title("Parcelle"),
            row![
                self.labeled_input("No parcelle", "", FicheField::ParcelNumber),
                self.labeled_input("No cadastral", "", FicheField::CadastralNumber),
            ]
            .spacing(8),
            self.labeled_input("No acte de vente", "", FicheField::DeedOfSaleNumber),
        ]
        .spacing(6)
        .into()
    }

    fn plan_section(&self) -> Element<'_, Message> {
        let selected_site =
            (!self.fiche.site.is_empty()).then(|| self.fiche.site.clone());
        let selected_dimension =
            (!self.fiche.dimension.is_empty()).then(|| self.fiche.dimension.clone());

        let site_picker = pick_list(tarifs::sites(), selected_site, Message::SiteSelected)
            .placeholder("Site");
        let dimension_picker = pick_list(
            tarifs::dimensions(&self.fiche.site),
            selected_dimension,
            Message::DimensionSelected,
        )
        .placeholder("Dimension");

        let rates = tarifs::resolve(&self.fiche.site, &self.fiche.dimension);

        column![
            self.section_title("Plan"),
            row![site_picker, dimension_picker].spacing(8),
            self.detail_line("Prix total", format!("{} USD", rates.total)),
            self.detail_line("Acompte initial", format!("{} USD", rates.down_payment)),
            self.detail_line(
                "Quotite mensuelle",
                format!("{} USD", rates.monthly_installment),
            ),
        ]
        .spacing(6)
        .into()
    }

    fn actions_row(&self) -> Element<'_, Message> {
        let save = button(text(if self.save_in_flight { "Saving..." } else { "Save" }))
            .on_press_maybe((!self.save_in_flight).then_some(Message::SaveFiche));
        let new_fiche = button("New fiche")
            .on_press_maybe((!self.sequence_in_flight).then_some(Message::NewFiche));
        let delete = button(text("Delete"))
            .style(theme::Button::Destructive)
            .on_press(Message::RequestDelete);

        row![save, new_fiche, delete]
            .spacing(8)
            .align_items(Alignment::Center)
            .into()
    }

    fn delete_prompt(&self) -> Element<'_, Message> {
        let email_input = text_input("Authorized email", &self.delete_email)
            .on_input(Message::DeleteEmailChanged)
            .padding(6)
            .size(12)
            .width(Length::Fill);
        let password_input = text_input("Password", &self.delete_password)
            .secure(true)
            .on_input(Message::DeletePasswordChanged)
            .padding(6)
            .size(12)
            .width(Length::Fill);

        let confirm = button(text("Confirm deletion"))
            .style(theme::Button::Destructive)
            .on_press_maybe((!self.delete_in_flight).then_some(Message::ConfirmDelete));
        let cancel = button("Cancel").on_press(Message::CancelDelete);

        let status = self.delete_status.as_deref().unwrap_or(
            "Deleting removes the fiche and its whole payment ledger.",
        );

        let content = column![
            self.section_title("Confirm deletion"),
            self.field_label("Email"),
            email_input,
            self.field_label("Password"),
            password_input,
            row![confirm, cancel].spacing(8).align_items(Alignment::Center),
            text(status)
                .size(12)
                .style(theme::Text::Color(Color::from_rgb8(0xe0, 0x4f, 0x4f))),
        ]
        .spacing(6);

        container(content)
            .padding(8)
            .style(theme::Container::Box)
            .into()
    }

    fn side_column(&self) -> Element<'_, Message> {
        let content = column![
            self.session_panel(),
            self.balance_panel(),
            self.payment_panel(),
            self.ledger_panel(),
            self.printout_panel(),
            self.qr_panel(),
        ]
        .spacing(12);

        let scroll = scrollable(content).height(Length::Fill).width(Length::Fill);

        container(scroll)
            .padding(12)
            .width(Length::FillPortion(1))
            .height(Length::Fill)
            .style(theme::Container::Box)
            .into()
    }

    fn session_panel(&self) -> Element<'_, Message> {
        let email = self
            .session
            .as_ref()
            .map(|session| session.email.as_str())
            .unwrap_or("-");

        let content = column![
            self.section_title("Session"),
            self.detail_line("Account", email.to_string()),
            button("Sign out").on_press(Message::Logout),
        ]
        .spacing(6);

        container(content)
            .padding(8)
            .style(theme::Container::Box)
            .into()
    }

    fn balance_panel(&self) -> Element<'_, Message> {
        let rates = tarifs::resolve(&self.fiche.site, &self.fiche.dimension);
        let balance = ledger::reconcile(&rates, self.fiche.is_persisted(), &self.payments);

        let mut content = column![
            self.section_title("Compte"),
            self.detail_line("Montant paye", format!("{} USD", balance.amount_paid)),
            self.detail_line("Reste a payer", format!("{} USD", balance.remaining)),
        ]
        .spacing(6);

        if !self.fiche.is_persisted() {
            content = content.push(
                text("Down payment counts once the fiche is saved.")
                    .size(12)
                    .style(theme::Text::Color(Color::from_rgb8(0x6a, 0x6a, 0x6a))),
            );
        }

        container(content)
            .padding(8)
            .style(theme::Container::Box)
            .into()
    }

    fn payment_panel(&self) -> Element<'_, Message> {
        let amount_input = text_input("Amount (USD)", &self.payment_amount)
            .on_input(Message::PaymentAmountChanged)
            .padding(6)
            .size(12)
            .width(Length::Fill);
        let reference_input = text_input("Bordereau reference", &self.payment_reference)
            .on_input(Message::PaymentReferenceChanged)
            .on_submit(Message::SubmitPayment)
            .padding(6)
            .size(12)
            .width(Length::Fill);

        let record = button(text("Record payment"))
            .on_press_maybe((!self.payment_in_flight).then_some(Message::SubmitPayment));

        let status = self.payment_status.as_deref().unwrap_or("Ready.");

        let content = column![
            self.section_title("Paiement"),
            amount_input,
            reference_input,
            record,
            text(status)
                .size(12)
                .style(theme::Text::Color(Color::from_rgb8(0x6a, 0x6a, 0x6a))),
        ]
        .spacing(6);

        container(content)
            .padding(8)
            .style(theme::Container::Box)
            .into()
    }

    fn ledger_panel(&self) -> Element<'_, Message> {
        let mut lines = column![].spacing(4);

        if self.payments.is_empty() {
            lines = lines.push(
                text("No payments recorded.")
                    .size(12)
                    .style(theme::Text::Color(Color::from_rgb8(0x4a, 0x4a, 0x4a))),
            );
        } else {
            for payment in &self.payments {
                lines = lines.push(
                    text(format!(
                        "{}  {} USD  ref {}",
                        payment.created_at.format("%Y-%m-%d"),
                        payment.amount,
                        payment.reference
                    ))
                    .size(12)
                    .style(theme::Text::Color(Color::from_rgb8(0x1f, 0x2a, 0x37))),
                );
            }
        }

        let content = column![
            self.section_title(&format!("Paiements ({})", self.payments.len())),
            lines,
        ]
        .spacing(6);

        container(content)
            .padding(8)
            .style(theme::Container::Box)
            .into()
    }

    fn printout_panel(&self) -> Element<'_, Message> {
        let path_input = text_input("fiche.txt", &self.printout_path)
            .on_input(Message::PrintoutPathChanged)
            .padding(6)
            .size(12)
            .width(Length::Fill);

        let path_controls = row![path_input, button("Export").on_press(Message::ExportPrintout)]
            .spacing(8)
            .align_items(Alignment::Center);

        let status = self.printout_status.as_deref().unwrap_or("Ready.");

        let content = column![
            self.section_title("Document"),
            self.field_label("File path"),
            path_controls,
            text(format!("Status: {status}"))
                .size(12)
                .style(theme::Text::Color(Color::from_rgb8(0x6a, 0x6a, 0x6a))),
        ]
        .spacing(6);

        container(content)
            .padding(8)
            .style(theme::Container::Box)
            .into()
    }

    fn qr_panel(&self) -> Element<'_, Message> {
        let body: Element<'_, Message> = if self.fiche.is_persisted() {
            match qr::render_badge(&qr::badge_payload(&self.fiche, Utc::now())) {
                Some(badge) => text(badge).size(10).into(),
                None => text("QR badge unavailable.")
                    .size(12)
                    .style(theme::Text::Color(Color::from_rgb8(0x6a, 0x6a, 0x6a)))
                    .into(),
            }
        } else {
            text("Save the fiche to generate its QR badge.")
                .size(12)
                .style(theme::Text::Color(Color::from_rgb8(0x6a, 0x6a, 0x6a)))
                .into()
        };

        let content = column![self.section_title("QR"), body].spacing(6);

        container(content)
            .padding(8)
            .style(theme::Container::Box)
            .into()
    }

    fn section_title(&self, label: &str) -> Element<'_, Message> {
        text(label.to_string())
            .size(16)
            .style(theme::Text::Color(Color::from_rgb8(0x12, 0x12, 0x12)))
            .into()
    }

    fn field_label(&self, label: &str) -> Element<'_, Message> {
        text(label.to_string())
            .size(12)
            .style(theme::Text::Color(Color::from_rgb8(0x3a, 0x4a, 0x5a)))
            .into()
    }

    fn labeled_input(
        &self,
        label: &str,
        placeholder: &str,
        field: FicheField,
    ) -> Element<'_, Message> {
        let input = text_input(placeholder, field.get(&self.fiche))
            .on_input(move |value| Message::FieldEdited(field, value))
            .padding(6)
            .size(12)
            .width(Length::Fill);

        column![self.field_label(label), input].spacing(4).into()
    }

    fn detail_line(&self, label: &str, value: String) -> Element<'_, Message> {
        let label = text(label.to_string())
            .size(13)
            .width(Length::Fill)
            .style(theme::Text::Color(Color::from_rgb8(0x3a, 0x4a, 0x5a)));
        let value = text(value)
            .size(13)
            .style(theme::Text::Color(Color::from_rgb8(0x1f, 0x2a, 0x37)));

        row![label, value]
            .spacing(12)
            .align_items(Alignment::Center)
            .into()
    }

    fn debug_tab_view(&self) -> Element<'_, Message> {
        let level_picker = pick_list(
            &LogLevel::ALL[..],
            Some(self.log_level),
            Message::LogLevelChanged,
        )
        .placeholder("Log level");

        let console_header = row![
            text("Console")
                .size(20)
                .style(theme::Text::Color(Color::from_rgb8(0x12, 0x12, 0x12))),
            level_picker
        ]
        .spacing(12)
        .align_items(Alignment::Center);

        let log_lines = self.log_lines_view();
        let filters = self.target_filters_view();

        let console = column![console_header, filters, log_lines]
            .spacing(12)
            .width(Length::FillPortion(2));

        let debug_panel = self.debug_panel_view();

        row![console, debug_panel]
            .spacing(16)
            .align_items(Alignment::Start)
            .into()
    }

    fn target_filters_view(&self) -> Element<'_, Message> {
        let mut filter_column = column![self.field_label("Targets")].spacing(6);

        for target in self.sorted_targets() {
            let enabled = self.enabled_targets.contains(&target);
            filter_column = filter_column.push(
                checkbox(target.clone(), enabled)
                    .on_toggle(move |value| Message::ToggleTarget(target.clone(), value)),
            );
        }

        container(filter_column)
            .padding(8)
            .style(theme::Container::Box)
            .into()
    }

    fn log_lines_view(&self) -> Element<'_, Message> {
        let mut lines = column![].spacing(4);

        for entry in self.visible_entries() {
            let color = level_color(entry.level);
            let line = text(entry.format_line())
                .size(14)
                .horizontal_alignment(Horizontal::Left)
                .style(theme::Text::Color(color));
            lines = lines.push(line);
        }

        scrollable(lines)
            .height(Length::Fill)
            .width(Length::Fill)
            .into()
    }

    fn debug_panel_view(&self) -> Element<'_, Message> {
        let copy_status = self.copy_status.as_deref().unwrap_or("Ready");
        let session = self
            .session
            .as_ref()
            .map(|session| session.email.clone())
            .unwrap_or_else(|| "none".to_string());

        let panel = column![
            text("Debug panel")
                .size(20)
                .style(theme::Text::Color(Color::from_rgb8(0x12, 0x12, 0x12))),
            text(format!("Session: {session}"))
                .size(14)
                .style(theme::Text::Color(Color::from_rgb8(0x4a, 0x4a, 0x4a))),
            text(format!("Fiche: {}", self.fiche.sequence))
                .size(14)
                .style(theme::Text::Color(Color::from_rgb8(0x4a, 0x4a, 0x4a))),
            text(format!("Payments loaded: {}", self.payments.len()))
                .size(14)
                .style(theme::Text::Color(Color::from_rgb8(0x4a, 0x4a, 0x4a))),
            text(format!("Idle seconds: {}", self.idle_seconds))
                .size(14)
                .style(theme::Text::Color(Color::from_rgb8(0x4a, 0x4a, 0x4a))),
            button("Copy diagnostics").on_press(Message::CopyDiagnostics),
            text(format!("Clipboard: {copy_status}"))
                .size(12)
                .style(theme::Text::Color(Color::from_rgb8(0x6a, 0x6a, 0x6a))),
        ]
        .spacing(10);

        container(panel)
            .padding(12)
            .width(Length::FillPortion(1))
            .style(theme::Container::Box)
            .into()
    }

    fn sorted_targets(&self) -> Vec<String> {
        let mut targets: Vec<String> = self.known_targets.iter().cloned().collect();
        targets.sort();
        targets
    }

    fn visible_entries(&self) -> Vec<&LogEntry> {
        self.log_entries
            .iter()
            .filter(|entry| self.enabled_targets.contains(&entry.target))
            .collect()
    }

    fn copy_diagnostics(&self) -> String {
        let text = self.diagnostics_text();
        match arboard::Clipboard::new().and_then(|mut clipboard| clipboard.set_text(text)) {
            Ok(()) => {
                tracing::info!(target: targets::UI, "Diagnostics copied to clipboard");
                "Copied".to_string()
            }
            Err(error) => {
                tracing::warn!(target: targets::UI, "Clipboard copy failed: {}", error);
                format!("Failed: {error}")
            }
        }
    }

    fn diagnostics_text(&self) -> String {
        let mut output = String::new();
        output.push_str("FicheDesk diagnostics\n");
        output.push_str(&format!("Log level: {}\n", self.log_level));
        output.push_str(&format!(
            "Session: {}\n",
            self.session
                .as_ref()
                .map(|session| session.email.as_str())
                .unwrap_or("none")
        ));
        output.push_str(&format!("Fiche: {}\n", self.fiche.sequence));
        output.push_str(&format!("Persisted: {}\n", self.fiche.is_persisted()));
        output.push_str(&format!("Payments loaded: {}\n", self.payments.len()));
        output.push_str(&format!(
            "Targets enabled: {}\n",
            self.sorted_targets()
                .into_iter()
                .filter(|target| self.enabled_targets.contains(target))
                .collect::<Vec<String>>()
                .join(", ")
        ));
        output.push_str("Recent logs:\n");

        let entries = self.visible_entries();
        let start = entries.len().saturating_sub(50);
        for entry in entries.into_iter().skip(start) {
            output.push_str(&entry.format_line());
            output.push('\n');
        }

        output
    }
}

fn activity_event(event: Event, _status: event::Status) -> Option<Message> {
    match event {
        Event::Mouse(_) | Event::Keyboard(_) | Event::Touch(_) => Some(Message::ActivityDetected),
        _ => None,
    }
}

fn level_color(level: tracing::Level) -> Color {
    match level {
        tracing::Level::ERROR => Color::from_rgb8(0xe0, 0x4f, 0x4f),
        tracing::Level::WARN => Color::from_rgb8(0xd9, 0x8e, 0x2b),
        tracing::Level::INFO => Color::from_rgb8(0x2b, 0x6c, 0xb0),
        tracing::Level::DEBUG => Color::from_rgb8(0x4a, 0x4a, 0x4a),
        tracing::Level::TRACE => Color::from_rgb8(0x8a, 0x8a, 0x8a),
    }
}
