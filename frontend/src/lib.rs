use client::auth::{self, AuthMode, AuthOutcome, AuthReply, LoginForm};
use client::chat::ChatRelay;
use client::dashboard::{Dashboard, Failure};
use client::sync::{self, Synced};
use client::tasks::Filter;
use client::{ApiClient, ApiError, Session};
use sauron::{
    html::{attributes::*, *},
    prelude::*,
};
use shared::{ChatMessage, ChatResponse, Task, TaskId, UpdateTaskRequest};
use web_sys::{console, window};

mod fetch;
mod storage;

use fetch::FetchTransport;

fn api() -> ApiClient<FetchTransport> {
    ApiClient::new(FetchTransport::default())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Page {
    Login,
    Dashboard,
}

#[derive(Debug, Clone)]
pub enum Msg {
    // Auth form
    SetUsername(String),
    SetEmail(String),
    SetPassword(String),
    ToggleAuthMode,
    SubmitAuth,
    AuthReplied(AuthReply),
    Logout,

    // Tasks
    LoadTasks,
    TasksSynced(Synced),
    SetNewTaskTitle(String),
    SetNewTaskDescription(String),
    CreateTask,
    TaskCreated(Synced),
    ToggleTask(TaskId),
    DeleteTask(TaskId),
    EditTask(TaskId),
    SetEditTitle(String),
    SetEditDescription(String),
    SaveEdit(TaskId),
    CancelEdit,
    ClearCompleted,
    SetFilter(Filter),
    SetQuery(String),

    // Chat
    ToggleChat,
    SetChatInput(String),
    SendChat,
    ChatReplied(ChatResponse),
    ChatFailed(ApiError),
}

pub struct Model {
    page: Page,
    form: LoginForm,
    dashboard: Dashboard,
    editing_task: Option<TaskId>,
    edit_title: String,
    edit_description: String,
    chat: ChatRelay,
    chat_open: bool,
    chat_input: String,
    chat_loading: bool,
}

impl Default for Model {
    fn default() -> Self {
        let session = storage::load_session();
        let page = if session.is_authenticated() {
            Page::Dashboard
        } else {
            Page::Login
        };
        Self {
            page,
            form: LoginForm::new(),
            dashboard: Dashboard::new(session),
            editing_task: None,
            edit_title: String::new(),
            edit_description: String::new(),
            chat: ChatRelay::new(),
            chat_open: false,
            chat_input: String::new(),
            chat_loading: false,
        }
    }
}

impl Model {
    fn session(&self) -> Option<Session> {
        self.dashboard.session.current().cloned()
    }

    /// Runs a task action against the server. Its outcome, reload
    /// included, comes back as `wrap(synced)`.
    fn run<F, Fut>(&self, wrap: fn(Synced) -> Msg, call: F) -> Cmd<Msg>
    where
        F: FnOnce(ApiClient<FetchTransport>, Session) -> Fut + 'static,
        Fut: std::future::Future<Output = Synced> + 'static,
    {
        let Some(session) = self.session() else {
            return Cmd::new(async { Msg::Logout });
        };
        Cmd::new(async move { wrap(call(api(), session).await) })
    }

    fn settle(&mut self, result: Result<(), Failure>) {
        match result {
            Ok(()) => {}
            Err(Failure::Reauthenticate) => self.show_login(),
            Err(Failure::Alert(message)) => {
                if let Some(w) = window() {
                    let _ = w.alert_with_message(&message);
                }
            }
        }
    }

    fn show_login(&mut self) {
        self.dashboard.logout();
        storage::save_session(&self.dashboard.session);
        self.chat = ChatRelay::new();
        self.page = Page::Login;
    }
}

impl Application for Model {
    type MSG = Msg;

    fn init(&mut self) -> Cmd<Msg> {
        if self.page == Page::Dashboard {
            Cmd::new(async { Msg::LoadTasks })
        } else {
            Cmd::none()
        }
    }

    fn update(&mut self, msg: Msg) -> Cmd<Msg> {
        match msg {
            Msg::SetUsername(value) => {
                self.form.username = value;
                Cmd::none()
            }
            Msg::SetEmail(value) => {
                self.form.email = value;
                Cmd::none()
            }
            Msg::SetPassword(value) => {
                self.form.password = value;
                Cmd::none()
            }
            Msg::ToggleAuthMode => {
                self.form.switch_mode();
                Cmd::none()
            }
            Msg::SubmitAuth => {
                self.form.start();
                let form = self.form.clone();
                Cmd::new(async move { Msg::AuthReplied(auth::request(&api(), &form).await) })
            }
            Msg::AuthReplied(reply) => {
                match self.form.finish(reply, &mut self.dashboard.session) {
                    AuthOutcome::SignedIn => {
                        storage::save_session(&self.dashboard.session);
                        self.page = Page::Dashboard;
                        Cmd::new(async { Msg::LoadTasks })
                    }
                    AuthOutcome::Registered | AuthOutcome::Failed => Cmd::none(),
                }
            }
            Msg::Logout => {
                self.show_login();
                Cmd::none()
            }
            Msg::LoadTasks => {
                if self.session().is_some() {
                    self.dashboard.tasks.set_loading(true);
                }
                self.run(Msg::TasksSynced, |api, session| async move {
                    sync::reload(&api, &session).await
                })
            }
            Msg::TasksSynced(synced) => {
                let result = self.dashboard.apply(synced);
                console::log_1(
                    &format!("[DEBUG] TasksSynced - {} tasks", self.dashboard.counts().total).into(),
                );
                self.settle(result);
                Cmd::none()
            }
            Msg::SetNewTaskTitle(value) => {
                self.dashboard.draft_title = value;
                Cmd::none()
            }
            Msg::SetNewTaskDescription(value) => {
                self.dashboard.draft_description = value;
                Cmd::none()
            }
            Msg::CreateTask => {
                let Some((title, description)) = self.dashboard.draft() else {
                    return Cmd::none();
                };
                self.run(Msg::TaskCreated, move |api, session| async move {
                    sync::create(&api, &session, &title, &description).await
                })
            }
            Msg::TaskCreated(synced) => {
                let result = self.dashboard.apply_created(synced);
                self.settle(result);
                Cmd::none()
            }
            Msg::ToggleTask(id) => {
                let Some(patch) = self.dashboard.tasks.toggle_patch(id) else {
                    return Cmd::none();
                };
                self.run(Msg::TasksSynced, move |api, session| async move {
                    sync::update(&api, &session, id, &patch).await
                })
            }
            Msg::DeleteTask(id) => {
                if !confirm("Delete this task?") {
                    return Cmd::none();
                }
                self.run(Msg::TasksSynced, move |api, session| async move {
                    sync::delete(&api, &session, id).await
                })
            }
            Msg::EditTask(id) => {
                if let Some(task) = self.dashboard.tasks.get(id) {
                    self.editing_task = Some(id);
                    self.edit_title = task.title.clone();
                    self.edit_description = task.description.clone();
                }
                Cmd::none()
            }
            Msg::SetEditTitle(value) => {
                self.edit_title = value;
                Cmd::none()
            }
            Msg::SetEditDescription(value) => {
                self.edit_description = value;
                Cmd::none()
            }
            Msg::SaveEdit(id) => {
                // Guard: only save if we're actually editing this task
                if self.editing_task != Some(id) || self.edit_title.trim().is_empty() {
                    return Cmd::none();
                }
                self.editing_task = None;
                let patch = UpdateTaskRequest::edit(
                    std::mem::take(&mut self.edit_title),
                    std::mem::take(&mut self.edit_description),
                );
                self.run(Msg::TasksSynced, move |api, session| async move {
                    sync::update(&api, &session, id, &patch).await
                })
            }
            Msg::CancelEdit => {
                self.editing_task = None;
                Cmd::none()
            }
            Msg::ClearCompleted => {
                let ids = self.dashboard.tasks.completed_ids();
                if ids.is_empty() || !confirm("Delete all completed tasks?") {
                    return Cmd::none();
                }
                self.run(Msg::TasksSynced, move |api, session| async move {
                    sync::clear_completed(&api, &session, &ids).await
                })
            }
            Msg::SetFilter(filter) => {
                self.dashboard.filter = filter;
                Cmd::none()
            }
            Msg::SetQuery(query) => {
                self.dashboard.query = query;
                Cmd::none()
            }
            Msg::ToggleChat => {
                self.chat_open = !self.chat_open;
                Cmd::none()
            }
            Msg::SetChatInput(value) => {
                self.chat_input = value;
                Cmd::none()
            }
            Msg::SendChat => {
                let Some(session) = self.session() else {
                    return Cmd::none();
                };
                let input = std::mem::take(&mut self.chat_input);
                let Some(request) = self.chat.begin_turn(&input, &session) else {
                    return Cmd::none();
                };
                self.chat_loading = true;
                Cmd::new(async move {
                    match api().chat(&request).await {
                        Ok(response) => Msg::ChatReplied(response),
                        Err(e) => Msg::ChatFailed(e),
                    }
                })
            }
            Msg::ChatReplied(response) => {
                self.chat.complete_turn(response);
                self.chat_loading = false;
                // The assistant may have changed tasks on our behalf.
                Cmd::new(async { Msg::LoadTasks })
            }
            Msg::ChatFailed(error) => {
                console::error_1(&format!("Chat error: {error}").into());
                self.chat_loading = false;
                Cmd::none()
            }
        }
    }

    fn view(&self) -> Node<Msg> {
        div(
            [class("min-h-screen bg-ctp-base text-ctp-text")],
            [match self.page {
                Page::Login => self.view_login(),
                Page::Dashboard => self.view_dashboard(),
            }],
        )
    }
}

impl Model {
    fn view_login(&self) -> Node<Msg> {
        let registering = self.form.mode == AuthMode::Register;
        div([class("flex items-center justify-center min-h-screen p-4")], [
            div([class("w-full max-w-md bg-ctp-surface0 rounded-lg shadow-lg p-8 border border-ctp-surface1")], [
                h1([class("text-2xl font-bold text-ctp-text mb-6")], [text(if registering { "Create Account" } else { "Welcome Back" })]),
                match &self.form.error {
                    Some(error) => div([class("mb-4 p-3 rounded-md bg-ctp-red/20 text-ctp-red")], [text(error)]),
                    None => span([], []),
                },
                match &self.form.notice {
                    Some(notice) => div([class("mb-4 p-3 rounded-md bg-ctp-green/20 text-ctp-green")], [text(notice)]),
                    None => span([], []),
                },
                div([class("space-y-4")], [
                    input([
                        r#type("text"),
                        placeholder("Username"),
                        value(&self.form.username),
                        on_input(|event| Msg::SetUsername(event.value())),
                        class("w-full px-3 py-2 bg-ctp-surface1 border border-ctp-surface2 rounded-md"),
                    ], []),
                    if registering {
                        input([
                            r#type("email"),
                            placeholder("Email"),
                            value(&self.form.email),
                            on_input(|event| Msg::SetEmail(event.value())),
                            class("w-full px-3 py-2 bg-ctp-surface1 border border-ctp-surface2 rounded-md"),
                        ], [])
                    } else {
                        span([], [])
                    },
                    input([
                        r#type("password"),
                        placeholder("Password"),
                        value(&self.form.password),
                        on_input(|event| Msg::SetPassword(event.value())),
                        class("w-full px-3 py-2 bg-ctp-surface1 border border-ctp-surface2 rounded-md"),
                    ], []),
                    button([
                        on_click(|_| Msg::SubmitAuth),
                        disabled(self.form.loading),
                        class("w-full bg-ctp-blue hover:bg-ctp-sapphire text-ctp-base font-medium px-6 py-2 rounded-md"),
                    ], [text(match (self.form.loading, registering) {
                        (true, _) => "Please wait...",
                        (false, true) => "Sign Up",
                        (false, false) => "Sign In",
                    })]),
                    button([
                        on_click(|_| Msg::ToggleAuthMode),
                        class("w-full text-sm text-ctp-subtext0 hover:text-ctp-text"),
                    ], [text(if registering { "Already have an account? Sign in" } else { "Need an account? Sign up" })]),
                ]),
            ]),
        ])
    }

    fn view_dashboard(&self) -> Node<Msg> {
        let counts = self.dashboard.counts();
        let username = self
            .dashboard
            .session
            .current()
            .map(|s| s.user.username.clone())
            .unwrap_or_default();
        div([], [
            header([class("bg-ctp-mantle shadow-lg border-b border-ctp-surface0")], [
                div([class("max-w-6xl mx-auto px-6 py-4 flex items-center justify-between")], [
                    h1([class("text-2xl font-bold text-ctp-text")], [text("TaskFlow")]),
                    div([class("flex items-center space-x-4")], [
                        span([class("text-ctp-subtext1")], [text(&username)]),
                        button([
                            on_click(|_| Msg::Logout),
                            class("px-3 py-2 rounded-md text-sm font-medium bg-ctp-surface0 hover:bg-ctp-surface1"),
                        ], [text("Logout")]),
                    ]),
                ]),
            ]),
            div([class("max-w-6xl mx-auto px-6 py-8 space-y-8")], [
                div([class("grid grid-cols-1 md:grid-cols-3 gap-6")], [
                    self.stat_card("Total Tasks", counts.total),
                    self.stat_card("Pending", counts.active),
                    self.stat_card("Completed", counts.completed),
                ]),
                self.view_create_form(),
                self.view_filters(),
                if self.dashboard.tasks.is_loading() {
                    div([class("text-center py-10 text-ctp-subtext0 italic")], [text("Loading...")])
                } else {
                    self.view_task_list()
                },
            ]),
            self.view_chat(),
        ])
    }

    fn stat_card(&self, card_title: &str, value: usize) -> Node<Msg> {
        div([class("bg-ctp-surface1 rounded-lg p-6 border border-ctp-surface2")], [
            p([class("text-sm font-medium text-ctp-subtext0")], [text(card_title)]),
            p([class("text-2xl font-bold text-ctp-text mt-1")], [text(value.to_string())]),
        ])
    }

    fn view_create_form(&self) -> Node<Msg> {
        div([class("p-6 bg-ctp-surface1 rounded-lg border border-ctp-surface2")], [
            h2([class("text-xl font-semibold text-ctp-text mb-4")], [text("Add New Task")]),
            div([class("space-y-4")], [
                input([
                    r#type("text"),
                    placeholder("Task title"),
                    value(&self.dashboard.draft_title),
                    on_input(|event| Msg::SetNewTaskTitle(event.value())),
                    class("w-full px-3 py-2 bg-ctp-surface0 border border-ctp-surface2 rounded-md"),
                ], []),
                textarea([
                    placeholder("Task description"),
                    value(&self.dashboard.draft_description),
                    on_input(|event| Msg::SetNewTaskDescription(event.value())),
                    class("w-full px-3 py-2 bg-ctp-surface0 border border-ctp-surface2 rounded-md h-20 resize-y"),
                ], []),
                button([
                    on_click(|_| Msg::CreateTask),
                    class("bg-ctp-blue hover:bg-ctp-sapphire text-ctp-base font-medium px-6 py-2 rounded-md"),
                ], [text("Add Task")]),
            ]),
        ])
    }

    fn view_filters(&self) -> Node<Msg> {
        div([class("flex flex-wrap items-center gap-4")], [
            div(
                [class("flex space-x-2")],
                [Filter::All, Filter::Active, Filter::Completed]
                    .into_iter()
                    .map(|filter| {
                        let active = self.dashboard.filter == filter;
                        button([
                            on_click(move |_| Msg::SetFilter(filter)),
                            class(if active {
                                "px-3 py-1 rounded-md text-sm bg-ctp-blue text-ctp-base"
                            } else {
                                "px-3 py-1 rounded-md text-sm bg-ctp-surface0 text-ctp-subtext0"
                            }),
                        ], [text(filter.label())])
                    })
                    .collect::<Vec<_>>(),
            ),
            input([
                r#type("search"),
                placeholder("Search tasks..."),
                value(&self.dashboard.query),
                on_input(|event| Msg::SetQuery(event.value())),
                class("flex-1 px-3 py-2 bg-ctp-surface0 border border-ctp-surface2 rounded-md"),
            ], []),
            button([
                on_click(|_| Msg::ClearCompleted),
                disabled(self.dashboard.counts().completed == 0),
                class("px-3 py-1 rounded-md text-sm bg-ctp-surface0 text-ctp-red hover:bg-ctp-surface1"),
            ], [text("Clear Completed")]),
        ])
    }

    fn view_task_list(&self) -> Node<Msg> {
        let visible = self.dashboard.visible();
        if visible.is_empty() {
            return div([class("text-center py-12")], [
                h3([class("text-lg font-medium text-ctp-text mb-2")], [text("No tasks found")]),
                p([class("text-ctp-subtext0")], [text("Create a new one above to get started!")]),
            ]);
        }
        div(
            [class("space-y-4")],
            visible.into_iter().map(|task| self.view_task(task)).collect::<Vec<_>>(),
        )
    }

    fn view_task(&self, task: &Task) -> Node<Msg> {
        let id = task.id;
        if self.editing_task == Some(id) {
            return div([class("p-4 bg-ctp-surface1 rounded-lg border border-ctp-blue space-y-3")], [
                input([
                    r#type("text"),
                    value(&self.edit_title),
                    on_input(|event| Msg::SetEditTitle(event.value())),
                    class("w-full px-3 py-2 bg-ctp-surface0 border border-ctp-surface2 rounded-md"),
                ], []),
                textarea([
                    value(&self.edit_description),
                    on_input(|event| Msg::SetEditDescription(event.value())),
                    class("w-full px-3 py-2 bg-ctp-surface0 border border-ctp-surface2 rounded-md h-20"),
                ], []),
                div([class("flex space-x-2")], [
                    button([on_click(move |_| Msg::SaveEdit(id)), class("bg-ctp-green text-ctp-base px-4 py-1 rounded-md")], [text("Save")]),
                    button([on_click(|_| Msg::CancelEdit), class("bg-ctp-surface2 px-4 py-1 rounded-md")], [text("Cancel")]),
                ]),
            ]);
        }

        div([class("p-4 bg-ctp-surface1 rounded-lg border border-ctp-surface2 flex items-start justify-between")], [
            div([class("flex items-start space-x-3")], [
                input([
                    r#type("checkbox"),
                    checked(task.completed),
                    on_click(move |_| Msg::ToggleTask(id)),
                    class("mt-1"),
                ], []),
                div([], [
                    h3([class(if task.completed {
                        "font-medium line-through text-ctp-subtext0"
                    } else {
                        "font-medium text-ctp-text"
                    })], [text(&task.title)]),
                    p([class("text-sm text-ctp-subtext1")], [text(&task.description)]),
                    p([class("text-xs text-ctp-overlay0 mt-1")], [text(task.created_at.format("%Y-%m-%d %H:%M").to_string())]),
                ]),
            ]),
            div([class("flex space-x-2")], [
                button([on_click(move |_| Msg::EditTask(id)), class("text-sm text-ctp-blue")], [text("Edit")]),
                button([on_click(move |_| Msg::DeleteTask(id)), class("text-sm text-ctp-red")], [text("Delete")]),
            ]),
        ])
    }

    fn view_chat(&self) -> Node<Msg> {
        div([class("fixed bottom-6 right-6 z-50")], [
            if self.chat_open {
                div([class("mb-4 w-96 h-[500px] bg-ctp-surface0 rounded-2xl shadow-2xl flex flex-col border border-ctp-surface1")], [
                    div([class("p-4 border-b border-ctp-surface1")], [
                        h3([class("font-bold text-lg")], [text("AI Assistant")]),
                        p([class("text-sm text-ctp-subtext0")], [text("Try: \"add task buy milk\"")]),
                    ]),
                    div(
                        [class("flex-1 overflow-y-auto p-4 space-y-3")],
                        self.chat.transcript().iter().map(view_chat_message).collect::<Vec<_>>(),
                    ),
                    div([class("p-4 border-t border-ctp-surface1 flex gap-2")], [
                        input([
                            r#type("text"),
                            placeholder("Type a message..."),
                            value(&self.chat_input),
                            disabled(self.chat_loading),
                            on_input(|event| Msg::SetChatInput(event.value())),
                            class("flex-1 px-3 py-2 rounded-lg bg-ctp-surface1 border border-ctp-surface2 text-sm"),
                        ], []),
                        button([
                            on_click(|_| Msg::SendChat),
                            disabled(self.chat_loading),
                            class("px-4 py-2 bg-ctp-blue text-ctp-base rounded-lg text-sm font-medium"),
                        ], [text(if self.chat_loading { "..." } else { "Send" })]),
                    ]),
                ])
            } else {
                span([], [])
            },
            button([
                on_click(|_| Msg::ToggleChat),
                class("w-16 h-16 bg-ctp-blue rounded-full shadow-2xl text-2xl text-ctp-base float-right"),
            ], [text(if self.chat_open { "✕" } else { "💬" })]),
        ])
    }
}

fn confirm(message: &str) -> bool {
    window()
        .and_then(|w| w.confirm_with_message(message).ok())
        .unwrap_or(false)
}

fn view_chat_message(message: &ChatMessage) -> Node<Msg> {
    let (row, bubble) = if message.is_user() {
        ("flex justify-end", "max-w-[80%] px-3 py-2 rounded-2xl text-sm bg-ctp-blue text-ctp-base")
    } else {
        ("flex justify-start", "max-w-[80%] px-3 py-2 rounded-2xl text-sm bg-ctp-surface1 text-ctp-text")
    };
    div([class(row)], [div([class(bubble)], [text(message.content())])])
}

#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    Program::mount_to_body(Model::default());
}
