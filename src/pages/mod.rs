use crate::dom::HtmlFormSurface;
use crate::forms::{Completion, FormSync};
use crate::models::{Sprint, Task};
use crate::state::AppContext;
use leptos::html;
use leptos::prelude::*;
use leptos::task::spawn_local;

fn set_hash(hash: &str) {
    if let Err(e) = window().location().set_hash(hash) {
        log::warn!("navigation to #{hash} failed: {e:?}");
    }
}

#[component]
pub fn HomepageView(ctx: AppContext) -> impl IntoView {
    let sprints: RwSignal<Vec<Sprint>> = RwSignal::new(Vec::new());
    let loading: RwSignal<bool> = RwSignal::new(true);
    let error: RwSignal<Option<String>> = RwSignal::new(None);
    let adding: RwSignal<bool> = RwSignal::new(false);

    // Collection URLs are only known after bootstrap; fetch_sprints waits.
    let state = ctx.get();
    spawn_local(async move {
        match state.fetch_sprints().await {
            Ok(list) => sprints.set(list),
            Err(e) if state.recover(&e) => {}
            Err(e) => error.set(Some(e.to_string())),
        }
        loading.set(false);
    });

    let on_sprint_done = Callback::new(move |_| adding.set(false));

    view! {
        <section class="home">
            <div class="flex items-center justify-between">
                <h2>"Sprints"</h2>
                <Show when=move || !adding.get() fallback=|| ().into_view()>
                    <button class="add" on:click=move |_| adding.set(true)>"Add Sprint"</button>
                </Show>
            </div>

            <Show when=move || adding.get() fallback=|| ().into_view()>
                <NewSprintView ctx=ctx on_done=on_sprint_done />
            </Show>

            <Show when=move || error.get().is_some() fallback=|| ().into_view()>
                <p class="error">{move || error.get().unwrap_or_default()}</p>
            </Show>

            <Show
                when=move || !loading.get()
                fallback=|| view! { <p class="text-xs text-muted-foreground">"Loading..."</p> }
            >
                <ul class="sprints">
                    {move || {
                        sprints
                            .get()
                            .into_iter()
                            .map(|sprint| {
                                let href = format!("#sprint/{}", sprint.id.unwrap_or_default());
                                view! {
                                    <li>
                                        <a href=href>{sprint.name}</a>
                                        <span class="end">{format!("Due {}", sprint.end)}</span>
                                    </li>
                                }
                            })
                            .collect_view()
                    }}
                </ul>
            </Show>
        </section>
    }
}

/// Inline create form; `on_done` fires on success and on cancel.
#[component]
pub fn NewSprintView(ctx: AppContext, on_done: Callback<()>) -> impl IntoView {
    let form_ref: NodeRef<html::Form> = NodeRef::new();
    let saving: RwSignal<bool> = RwSignal::new(false);

    let form_sync = move || {
        let completion = Completion::new();
        completion.on_done(move || on_done.run(()));
        form_ref
            .get_untracked()
            .map(|form| FormSync::new(HtmlFormSurface::new(form), completion))
    };

    let on_submit = move |ev: web_sys::SubmitEvent| {
        let Some(form) = form_sync() else {
            return;
        };
        let attributes = form.submit(&ev);
        if saving.get_untracked() {
            return;
        }
        let state = ctx.get();
        saving.set(true);

        spawn_local(async move {
            match state.create_sprint(&attributes).await {
                Ok(sprint) => {
                    saving.set(false);
                    form.done(None);
                    if let Some(id) = sprint.id {
                        set_hash(&format!("sprint/{id}"));
                    }
                }
                Err(e) => {
                    saving.set(false);
                    if !state.recover(&e) {
                        form.failure(&e);
                    }
                }
            }
        });
    };

    let on_cancel = move |ev: web_sys::MouseEvent| {
        let ev: &web_sys::Event = ev.as_ref();
        match form_sync() {
            Some(form) => form.done(Some(ev)),
            None => on_done.run(()),
        }
    };

    view! {
        <form class="add-sprint" node_ref=form_ref on:submit=on_submit>
            <div>
                <label for="id_name">"Name"</label>
                <input id="id_name" name="name" type="text" maxlength="100" />
            </div>
            <div>
                <label for="id_end">"End Date"</label>
                <input id="id_end" name="end" type="date" />
            </div>
            <div>
                <label for="id_description">"Description"</label>
                <textarea id="id_description" name="description"></textarea>
            </div>
            <button type="submit" disabled=move || saving.get()>"Add"</button>
            <button type="button" class="cancel" on:click=on_cancel>"Cancel"</button>
        </form>
    }
}

#[component]
pub fn LoginView(ctx: AppContext, completion: StoredValue<Completion, LocalStorage>) -> impl IntoView {
    let loading: RwSignal<bool> = RwSignal::new(false);

    let on_submit = move |ev: web_sys::SubmitEvent| {
        let Some(surface) = HtmlFormSurface::from_event(&ev) else {
            ev.prevent_default();
            return;
        };
        let form = FormSync::new(surface, completion.get_value());
        let credentials = form.submit(&ev);
        if loading.get_untracked() {
            return;
        }
        let state = ctx.get();
        loading.set(true);

        spawn_local(async move {
            match state.client.login(&state.config.api_login, &credentials).await {
                Ok(response) => {
                    loading.set(false);
                    form.login_succeeded(&state.session, response);
                }
                Err(e) => {
                    form.failure(&e);
                    loading.set(false);
                }
            }
        });
    };

    view! {
        <form class="login" on:submit=on_submit>
            <h2>"Log in"</h2>
            <div>
                <label for="id_username">"Username"</label>
                <input id="id_username" name="username" type="text" autocomplete="username" />
            </div>
            <div>
                <label for="id_password">"Password"</label>
                <input id="id_password" name="password" type="password" autocomplete="current-password" />
            </div>
            <button type="submit" disabled=move || loading.get()>
                {move || if loading.get() { "Signing in..." } else { "Login" }}
            </button>
        </form>
    }
}

/// Auth-dependent chrome; remounted after login.
#[component]
pub fn HeaderView(ctx: AppContext) -> impl IntoView {
    let authenticated = ctx.get().session.authenticated();

    let on_logout = move |ev: web_sys::MouseEvent| {
        ev.prevent_default();
        ctx.get().session.delete();
        let _ = window().location().set_href("/");
    };

    view! {
        <div class="title-bar">
            <a class="brand" href="#">"Scrum Board"</a>
            {authenticated.then(|| view! {
                <nav>
                    <a class="logout" href="/" on:click=on_logout>"Logout"</a>
                </nav>
            })}
        </div>
    }
}

#[component]
pub fn SprintView(ctx: AppContext, id: String) -> impl IntoView {
    let sprint: RwSignal<Option<Sprint>> = RwSignal::new(None);
    let tasks: RwSignal<Vec<Task>> = RwSignal::new(Vec::new());
    let error: RwSignal<Option<String>> = RwSignal::new(None);

    let state = ctx.get();
    spawn_local(async move {
        let loaded = match state.fetch_sprint(&id).await {
            Ok(s) => s,
            Err(e) => {
                if !state.recover(&e) {
                    error.set(Some(e.to_string()));
                }
                return;
            }
        };
        match state.fetch_sprint_tasks(&loaded).await {
            Ok(list) => tasks.set(list),
            Err(e) if state.recover(&e) => return,
            Err(e) => log::warn!("tasks for sprint {id} unavailable: {e}"),
        }
        sprint.set(Some(loaded));
    });

    view! {
        <section class="sprint">
            <Show when=move || error.get().is_some() fallback=|| ().into_view()>
                <p class="error">{move || error.get().unwrap_or_default()}</p>
            </Show>
            {move || {
                sprint.get().map(|s| view! {
                    <h2>{s.name}</h2>
                    <p class="end">{format!("Ends {}", s.end)}</p>
                    <p class="description">{s.description}</p>
                })
            }}
            <ul class="tasks">
                {move || {
                    tasks
                        .get()
                        .into_iter()
                        .map(|task| {
                            let status = if task.status_display.is_empty() {
                                i64::from(task.status).to_string()
                            } else {
                                task.status_display
                            };
                            view! {
                                <li>
                                    <span class="name">{task.name}</span>
                                    <span class="status">{status}</span>
                                    <span class="assigned">{task.assigned.unwrap_or_default()}</span>
                                </li>
                            }
                        })
                        .collect_view()
                }}
            </ul>
        </section>
    }
}
