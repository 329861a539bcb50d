use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: usize = 12;
pub const MAX_SCORE: u32 = 100;

/// A film as served by the upstream catalog. Numeric-looking fields stay
/// strings; see [`crate::filters::parse_number`].
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct Film {
    pub id: String,
    pub title: String,
    pub original_title: String,
    pub original_title_romanised: String,
    pub image: String,
    pub movie_banner: String,
    pub description: String,
    pub director: String,
    pub producer: String,
    pub release_date: String,
    pub running_time: String,
    pub rt_score: String,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOption {
    #[default]
    TitleAsc,
    ReleaseDesc,
    RatingDesc,
}

impl SortOption {
    pub const ALL: [SortOption; 3] =
        [SortOption::TitleAsc, SortOption::ReleaseDesc, SortOption::RatingDesc];

    pub fn as_str(self) -> &'static str {
        match self {
            SortOption::TitleAsc => "title-asc",
            SortOption::ReleaseDesc => "release-desc",
            SortOption::RatingDesc => "rating-desc",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortOption::TitleAsc => "Title (A-Z)",
            SortOption::ReleaseDesc => "Newest first",
            SortOption::RatingDesc => "Highest rated",
        }
    }

    /// Unknown values fall back to `title-asc`.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim() {
            "release-desc" => SortOption::ReleaseDesc,
            "rating-desc" => SortOption::RatingDesc,
            _ => SortOption::TitleAsc,
        }
    }
}

/// Catalog query configuration. An empty facet list means no constraint on
/// that facet; build partial configurations with struct update syntax over
/// `FilmFilters::default()`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilmFilters {
    pub search: String,
    pub directors: Vec<String>,
    pub producers: Vec<String>,
    pub years: Vec<String>,
    pub min_score: u32,
    pub sort: SortOption,
    pub page: i64,
    pub page_size: usize,
}

impl Default for FilmFilters {
    fn default() -> Self {
        Self {
            search: String::new(),
            directors: Vec::new(),
            producers: Vec::new(),
            years: Vec::new(),
            min_score: 0,
            sort: SortOption::TitleAsc,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl FilmFilters {
    /// Renders the non-default parameters back into a query string, with
    /// `page` replaced by the given value. Used for pagination links.
    pub fn to_query_string(&self, page: usize) -> String {
        let mut pairs: Vec<(&str, String)> = Vec::new();
        if !self.search.trim().is_empty() {
            pairs.push(("search", self.search.clone()));
        }
        pairs.extend(self.directors.iter().map(|d| ("director", d.clone())));
        pairs.extend(self.producers.iter().map(|p| ("producer", p.clone())));
        pairs.extend(self.years.iter().map(|y| ("year", y.clone())));
        if self.min_score > 0 {
            pairs.push(("minScore", self.min_score.to_string()));
        }
        if self.sort != SortOption::TitleAsc {
            pairs.push(("sort", self.sort.as_str().to_string()));
        }
        if page > 1 {
            pairs.push(("page", page.to_string()));
        }

        pairs
            .into_iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(&v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Raw catalog URL parameters. Facets repeat (`director=a&director=b`).
#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    pub search: Option<String>,
    #[serde(default)]
    pub director: Vec<String>,
    #[serde(default)]
    pub producer: Vec<String>,
    #[serde(default)]
    pub year: Vec<String>,
    #[serde(rename = "minScore")]
    pub min_score: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
}

impl From<CatalogQuery> for FilmFilters {
    fn from(q: CatalogQuery) -> Self {
        let non_empty = |values: Vec<String>| -> Vec<String> {
            values.into_iter().filter(|v| !v.trim().is_empty()).collect()
        };

        let min_score = q
            .min_score
            .as_deref()
            .map(crate::filters::parse_number)
            .unwrap_or(0)
            .clamp(0, MAX_SCORE as i64) as u32;

        let page = q
            .page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .unwrap_or(1);

        FilmFilters {
            search: q.search.unwrap_or_default(),
            directors: non_empty(q.director),
            producers: non_empty(q.producer),
            years: non_empty(q.year),
            min_score,
            sort: q.sort.as_deref().map(SortOption::parse_lenient).unwrap_or_default(),
            page,
            ..FilmFilters::default()
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub directors: Vec<String>,
    pub producers: Vec<String>,
    pub years: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total_pages: usize,
    pub current_page: usize,
}

/// Film projection returned by the favorites API.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteFilmView {
    pub id: String,
    pub title: String,
    pub director: String,
    pub producer: String,
    pub release_year: i32,
    pub rt_score: i32,
    pub data: serde_json::Value,
}

impl FavoriteFilmView {
    /// Full film record for rendering. Rows whose blob does not decode fall
    /// back to the projected columns.
    pub fn to_film(&self) -> Film {
        serde_json::from_value::<Film>(self.data.clone())
            .ok()
            .filter(|f| !f.id.is_empty())
            .unwrap_or_else(|| Film {
                id: self.id.clone(),
                title: self.title.clone(),
                director: self.director.clone(),
                producer: self.producer.clone(),
                release_date: self.release_year.to_string(),
                rt_score: self.rt_score.to_string(),
                ..Film::default()
            })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRequest {
    #[serde(default)]
    pub film_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}
