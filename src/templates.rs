use std::collections::HashSet;

use maud::{DOCTYPE, Markup, html};

use crate::{
    auth::Identity,
    models::{Film, FilmFilters, FilterOptions, Paginated, SortOption},
};

const TAILWIND_CDN: &str = "https://cdn.tailwindcss.com";
const SITE_NAME: &str = "ghibli-brary";

pub struct CatalogView<'a> {
    pub page: &'a Paginated<Film>,
    pub total_matches: usize,
    pub filters: &'a FilmFilters,
    pub options: &'a FilterOptions,
    pub favorite_ids: &'a HashSet<String>,
}

pub fn catalog_page(user: Option<&Identity>, view: &CatalogView<'_>) -> String {
    page(
        SITE_NAME,
        user,
        html! {
            div class="max-w-7xl mx-auto px-6 py-10" {
                h1 class="text-3xl font-bold text-gray-900" { "Studio Ghibli library" }
                p class="mt-2 text-gray-600" { (match_summary(view.total_matches)) }

                form class="mt-8 grid gap-6 lg:grid-cols-4" method="get" action="/" {
                    (filter_panel(view.filters, view.options))

                    div class="lg:col-span-3" {
                        div class="flex flex-col gap-4 sm:flex-row" {
                            input class="flex-1 rounded-md border border-gray-300 px-3 py-2" type="search" name="search" placeholder="Search titles and synopses" value=(view.filters.search);
                            select class="rounded-md border border-gray-300 px-3 py-2" name="sort" {
                                @for sort in SortOption::ALL {
                                    option value=(sort.as_str()) selected[sort == view.filters.sort] { (sort.label()) }
                                }
                            }
                            button class="rounded-md bg-blue-600 px-4 py-2 font-semibold text-white hover:bg-blue-700" type="submit" { "Apply" }
                        }

                        @if view.page.items.is_empty() {
                            div class="mt-10 bg-white shadow rounded-lg p-8 text-center" {
                                p class="text-gray-600" { "No films match these filters." }
                                a class="mt-4 inline-block text-blue-600 hover:text-blue-800" href="/" { "Clear filters" }
                            }
                        } @else {
                            div class="mt-8 grid gap-6 sm:grid-cols-2 xl:grid-cols-3" {
                                @for film in &view.page.items {
                                    (film_card(film, view.favorite_ids.contains(&film.id)))
                                }
                            }
                            (pagination(view.filters, view.page))
                        }
                    }
                }
            }
        },
    )
}

pub fn film_page(user: Option<&Identity>, film: &Film, is_favorite: bool) -> String {
    page(
        &format!("{} • {}", film.title, SITE_NAME),
        user,
        html! {
            div class="max-w-5xl mx-auto px-6 py-10" {
                a class="text-sm text-blue-600 hover:text-blue-800" href="/" { "← Back to library" }

                article class="mt-6 space-y-8" {
                    @if !film.movie_banner.is_empty() {
                        img class="w-full rounded-lg object-cover" src=(film.movie_banner) alt=(format!("{} banner", film.title));
                    }
                    div class="flex items-start justify-between gap-4" {
                        div {
                            h1 class="text-4xl font-bold text-gray-900" { (film.title) }
                            p class="mt-2 text-sm text-gray-500" { (film.original_title) " (" (film.original_title_romanised) ")" }
                        }
                        (favorite_form(&film.id, user.is_some(), is_favorite))
                    }

                    div class="grid gap-6 lg:grid-cols-3" {
                        dl class="bg-white shadow rounded-lg p-6 space-y-3 text-sm" {
                            (detail_row("Director", &film.director))
                            (detail_row("Producer", &film.producer))
                            (detail_row("Release year", &film.release_date))
                            (detail_row("Running time", &format!("{} minutes", film.running_time)))
                            (detail_row("Rotten Tomatoes", &film.rt_score))
                        }
                        section class="bg-white shadow rounded-lg p-6 lg:col-span-2" {
                            h2 class="text-xl font-semibold text-gray-900" { "Synopsis" }
                            p class="mt-3 leading-relaxed text-gray-700" { (film.description) }
                        }
                    }
                }
            }
        },
    )
}

pub fn favorites_page(user: Option<&Identity>, films: &[Film]) -> String {
    page(
        &format!("Your favorites • {SITE_NAME}"),
        user,
        html! {
            div class="max-w-7xl mx-auto px-6 py-10" {
                div class="flex items-start justify-between gap-6" {
                    div {
                        h1 class="text-3xl font-bold text-gray-900" { "Your favorites" }
                        p class="mt-2 text-gray-600" { "The Ghibli stories you love most." }
                    }
                    a class="text-sm text-blue-600 hover:text-blue-800" href="/" { "← Back to library" }
                }

                @if films.is_empty() {
                    div class="mt-10 bg-white shadow rounded-lg p-8 text-center" {
                        p class="text-gray-600" { "No favorites yet. Start exploring the library and add a few!" }
                    }
                } @else {
                    div class="mt-10 grid gap-6 sm:grid-cols-2 xl:grid-cols-3" {
                        @for film in films {
                            (film_card(film, true))
                        }
                    }
                }
            }
        },
    )
}

pub fn login_page(error: Option<&str>) -> String {
    credentials_page("Sign in", "/login", "Sign in", error, html! {
        p class="mt-6 text-sm text-gray-600" {
            "No account yet? " a class="text-blue-600 hover:text-blue-800" href="/register" { "Register" }
        }
    })
}

pub fn register_page(error: Option<&str>) -> String {
    credentials_page("Create an account", "/register", "Register", error, html! {
        p class="mt-6 text-sm text-gray-600" {
            "Already registered? " a class="text-blue-600 hover:text-blue-800" href="/login" { "Sign in" }
        }
    })
}

pub fn error_page(user: Option<&Identity>, message: &str, retry_href: &str) -> String {
    page(
        "Error",
        user,
        html! {
            div class="max-w-xl mx-auto px-6 py-20" {
                div class="bg-white shadow rounded-lg p-8" {
                    h1 class="text-2xl font-bold text-gray-900" { "Something went wrong" }
                    p class="mt-4 text-gray-700" { (message) }
                    a class="mt-6 inline-block rounded-md bg-blue-600 px-4 py-2 font-semibold text-white hover:bg-blue-700" href=(retry_href) { "Try again" }
                }
            }
        },
    )
}

pub fn not_found_page(user: Option<&Identity>) -> String {
    page(
        &format!("Film not found • {SITE_NAME}"),
        user,
        html! {
            div class="max-w-xl mx-auto px-6 py-20" {
                div class="bg-white shadow rounded-lg p-8" {
                    h1 class="text-2xl font-bold text-gray-900" { "Film not found" }
                    p class="mt-4 text-gray-700" { "We couldn't find that film in the library." }
                    a class="mt-6 inline-block text-blue-600 hover:text-blue-800" href="/" { "← Back to library" }
                }
            }
        },
    )
}

fn match_summary(count: usize) -> String {
    if count == 1 {
        "1 film matches your filters.".to_string()
    } else {
        format!("{count} films match your filters.")
    }
}

fn page(title: &str, user: Option<&Identity>, body: Markup) -> String {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
                script src=(TAILWIND_CDN) {}
            }
            body class="min-h-screen bg-gray-50" {
                (nav(user))
                main { (body) }
            }
        }
    }
    .into_string()
}

fn nav(user: Option<&Identity>) -> Markup {
    html! {
        nav class="bg-white shadow" {
            div class="max-w-7xl mx-auto px-6 py-4 flex items-center justify-between" {
                a class="text-lg font-bold text-gray-900" href="/" { (SITE_NAME) }
                div class="flex items-center gap-4 text-sm" {
                    @if let Some(user) = user {
                        a class="text-gray-700 hover:text-gray-900" href="/favorites" { "Favorites" }
                        span class="text-gray-500" { (user.email) }
                        form method="post" action="/logout" {
                            button class="text-blue-600 hover:text-blue-800" type="submit" { "Sign out" }
                        }
                    } @else {
                        a class="text-blue-600 hover:text-blue-800" href="/login" { "Sign in" }
                        a class="text-blue-600 hover:text-blue-800" href="/register" { "Register" }
                    }
                }
            }
        }
    }
}

fn credentials_page(title: &str, action: &str, submit: &str, error: Option<&str>, footer: Markup) -> String {
    page(
        title,
        None,
        html! {
            div class="max-w-md mx-auto px-6 py-16" {
                div class="bg-white shadow rounded-lg p-8" {
                    h1 class="text-2xl font-bold text-gray-900" { (title) }
                    @if let Some(error) = error {
                        p class="mt-4 rounded-md bg-red-50 px-3 py-2 text-sm text-red-700" role="alert" { (error) }
                    }
                    form class="mt-6 space-y-4" method="post" action=(action) {
                        div {
                            label class="block text-sm font-medium text-gray-700" for="email" { "Email" }
                            input class="mt-2 w-full rounded-md border border-gray-300 px-3 py-2" type="email" name="email" id="email" required;
                        }
                        div {
                            label class="block text-sm font-medium text-gray-700" for="password" { "Password" }
                            input class="mt-2 w-full rounded-md border border-gray-300 px-3 py-2" type="password" name="password" id="password" minlength="8" required;
                        }
                        button class="w-full rounded-md bg-blue-600 px-4 py-2 font-semibold text-white hover:bg-blue-700" type="submit" { (submit) }
                    }
                    (footer)
                }
            }
        },
    )
}

fn filter_panel(filters: &FilmFilters, options: &FilterOptions) -> Markup {
    html! {
        aside class="bg-white shadow rounded-lg p-6 space-y-6 text-sm" {
            (facet("Director", "director", &options.directors, &filters.directors))
            (facet("Producer", "producer", &options.producers, &filters.producers))
            (facet("Release year", "year", &options.years, &filters.years))
            div {
                label class="block font-semibold text-gray-700" for="minScore" { "Minimum score" }
                input class="mt-2 w-full rounded-md border border-gray-300 px-3 py-2" type="number" min="0" max="100" name="minScore" id="minScore" value=(filters.min_score);
            }
        }
    }
}

fn facet(label: &str, name: &str, values: &[String], selected: &[String]) -> Markup {
    html! {
        fieldset {
            legend class="font-semibold text-gray-700" { (label) }
            div class="mt-2 space-y-1 max-h-48 overflow-y-auto" {
                @for value in values {
                    label class="flex items-center gap-2 text-gray-600" {
                        input type="checkbox" name=(name) value=(value) checked[selected.contains(value)];
                        (value)
                    }
                }
            }
        }
    }
}

fn film_card(film: &Film, is_favorite: bool) -> Markup {
    html! {
        a class="block bg-white shadow rounded-lg overflow-hidden hover:shadow-md" href=(format!("/film/{}", urlencoding::encode(&film.id))) {
            @if !film.image.is_empty() {
                img class="w-full aspect-[2/3] object-cover" src=(film.image) alt=(format!("{} poster", film.title)) loading="lazy";
            }
            div class="p-4" {
                div class="flex items-start justify-between gap-2" {
                    h2 class="text-lg font-semibold text-gray-900" { (film.title) }
                    @if is_favorite {
                        span class="rounded-full bg-green-100 px-2 py-0.5 text-xs font-semibold text-green-800" { "Favorited" }
                    }
                }
                p class="mt-1 text-sm text-gray-500" { (film.release_date) " · " (film.director) }
                p class="mt-1 text-sm text-gray-500" { "Rotten Tomatoes " (film.rt_score) }
            }
        }
    }
}

fn favorite_form(film_id: &str, signed_in: bool, is_favorite: bool) -> Markup {
    html! {
        @if signed_in {
            form method="post" action=(format!("/film/{}/favorite", urlencoding::encode(film_id))) {
                @if is_favorite {
                    button class="rounded-full bg-green-600 px-4 py-1.5 text-sm font-semibold text-white" type="submit" aria-pressed="true" { "Favorited" }
                } @else {
                    button class="rounded-full border border-gray-300 px-4 py-1.5 text-sm font-semibold text-gray-700 hover:border-blue-400" type="submit" aria-pressed="false" { "Favorite" }
                }
            }
        } @else {
            a class="rounded-full border border-gray-300 px-4 py-1.5 text-sm font-semibold text-gray-700" href="/login" { "Sign in to favorite" }
        }
    }
}

fn detail_row(label: &str, value: &str) -> Markup {
    html! {
        div class="flex justify-between gap-4" {
            dt class="font-semibold text-gray-900" { (label) }
            dd class="text-gray-600" { (value) }
        }
    }
}

fn pagination(filters: &FilmFilters, page: &Paginated<Film>) -> Markup {
    let href = |n: usize| {
        let query = filters.to_query_string(n);
        if query.is_empty() { "/".to_string() } else { format!("/?{query}") }
    };

    html! {
        @if page.total_pages > 1 {
            nav class="mt-8 flex items-center justify-between text-sm" aria-label="Pagination" {
                @if page.current_page > 1 {
                    a class="text-blue-600 hover:text-blue-800" href=(href(page.current_page - 1)) { "← Previous" }
                } @else {
                    span {}
                }
                span class="text-gray-600" { "Page " (page.current_page) " of " (page.total_pages) }
                @if page.current_page < page.total_pages {
                    a class="text-blue-600 hover:text-blue-800" href=(href(page.current_page + 1)) { "Next →" }
                } @else {
                    span {}
                }
            }
        }
    }
}
