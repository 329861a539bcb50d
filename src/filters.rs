//! Derived catalog views: facet options, filtering, sorting and paging over
//! an in-memory film list. Nothing here performs I/O or mutates its input.

use std::{cmp::Reverse, collections::BTreeSet};

use crate::models::{Film, FilmFilters, FilterOptions, Paginated, SortOption};

/// Parses the leading integer of an upstream numeric string. Anything that
/// does not start with digits (after an optional sign) counts as 0.
pub fn parse_number(value: &str) -> i64 {
    let s = value.trim_start();
    let (sign, digits) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = digits.bytes().take_while(u8::is_ascii_digit).count();
    digits[..end].parse::<i64>().map(|n| sign * n).unwrap_or(0)
}

pub fn get_filter_options(films: &[Film]) -> FilterOptions {
    let mut directors = BTreeSet::new();
    let mut producers = BTreeSet::new();
    let mut years = BTreeSet::new();

    for film in films {
        if !film.director.is_empty() {
            directors.insert(film.director.as_str());
        }
        if !film.producer.is_empty() {
            producers.insert(film.producer.as_str());
        }
        if !film.release_date.is_empty() {
            years.insert(film.release_date.as_str());
        }
    }

    let mut directors: Vec<String> = directors.into_iter().map(str::to_string).collect();
    let mut producers: Vec<String> = producers.into_iter().map(str::to_string).collect();
    let mut years: Vec<String> = years.into_iter().map(str::to_string).collect();

    directors.sort_by_cached_key(|d| collation_key(d));
    producers.sort_by_cached_key(|p| collation_key(p));
    years.sort_by_key(|y| parse_number(y));

    FilterOptions { directors, producers, years }
}

pub fn apply_filters(films: &[Film], filters: &FilmFilters) -> Vec<Film> {
    let search = filters.search.trim().to_lowercase();
    let min_score = i64::from(filters.min_score);

    films
        .iter()
        .filter(|film| {
            if !search.is_empty() {
                let haystack = format!("{} {}", film.title, film.description).to_lowercase();
                if !haystack.contains(&search) {
                    return false;
                }
            }

            if !filters.directors.is_empty() && !filters.directors.contains(&film.director) {
                return false;
            }

            if !filters.producers.is_empty() && !filters.producers.contains(&film.producer) {
                return false;
            }

            if !filters.years.is_empty() && !filters.years.contains(&film.release_date) {
                return false;
            }

            min_score == 0 || parse_number(&film.rt_score) >= min_score
        })
        .cloned()
        .collect()
}

/// Returns a sorted copy. All orders are stable, so equal keys keep their
/// input order.
pub fn apply_sort(films: &[Film], sort: SortOption) -> Vec<Film> {
    let mut out = films.to_vec();
    match sort {
        SortOption::TitleAsc => out.sort_by_cached_key(|f| f.title.to_lowercase()),
        SortOption::ReleaseDesc => out.sort_by_key(|f| Reverse(parse_number(&f.release_date))),
        SortOption::RatingDesc => out.sort_by_key(|f| Reverse(parse_number(&f.rt_score))),
    }
    out
}

/// `page` is clamped into `1..=total_pages`; a zero page size is treated as 1.
pub fn paginate_films(films: &[Film], page: i64, page_size: usize) -> Paginated<Film> {
    let page_size = page_size.max(1);
    let total_pages = films.len().div_ceil(page_size).max(1);
    let current_page = page.clamp(1, total_pages as i64) as usize;
    let offset = (current_page - 1) * page_size;

    let items = films.iter().skip(offset).take(page_size).cloned().collect();

    Paginated { items, total_pages, current_page }
}

/// Filter, sort, then page: the full catalog view for one query.
pub fn catalog_view(films: &[Film], filters: &FilmFilters) -> (usize, Paginated<Film>) {
    let filtered = apply_filters(films, filters);
    let sorted = apply_sort(&filtered, filters.sort);
    (sorted.len(), paginate_films(&sorted, filters.page, filters.page_size))
}

fn collation_key(value: &str) -> (String, String) {
    (value.to_lowercase(), value.to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn film(id: &str, title: &str, description: &str, director: &str, producer: &str, year: &str, score: &str) -> Film {
        Film {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            director: director.to_string(),
            producer: producer.to_string(),
            release_date: year.to_string(),
            rt_score: score.to_string(),
            ..Film::default()
        }
    }

    pub(crate) fn fixture() -> Vec<Film> {
        vec![
            film(
                "1",
                "My Neighbor Totoro",
                "Two sisters encounter woodland spirits.",
                "Hayao Miyazaki",
                "Toru Hara",
                "1988",
                "93",
            ),
            film(
                "2",
                "Spirited Away",
                "Chihiro enters the spirit world.",
                "Hayao Miyazaki",
                "Toshio Suzuki",
                "2001",
                "97",
            ),
            film(
                "3",
                "Whisper of the Heart",
                "A young girl discovers her talent for writing.",
                "Yoshifumi Kondō",
                "Toshio Suzuki",
                "1995",
                "91",
            ),
        ]
    }

    fn titles(films: &[Film]) -> Vec<&str> {
        films.iter().map(|f| f.title.as_str()).collect()
    }

    #[test]
    fn parse_number_reads_leading_digits() {
        assert_eq!(parse_number("93"), 93);
        assert_eq!(parse_number(" 86 min"), 86);
        assert_eq!(parse_number("-4"), -4);
        assert_eq!(parse_number("n/a"), 0);
        assert_eq!(parse_number(""), 0);
    }

    #[test]
    fn filters_by_search_director_and_min_score() {
        let filters = FilmFilters {
            search: "spirit".to_string(),
            directors: vec!["Hayao Miyazaki".to_string()],
            min_score: 95,
            ..FilmFilters::default()
        };
        assert_eq!(titles(&apply_filters(&fixture(), &filters)), vec!["Spirited Away"]);
    }

    #[test]
    fn filters_by_producer_and_year() {
        let filters = FilmFilters {
            producers: vec!["Toshio Suzuki".to_string()],
            years: vec!["1995".to_string()],
            ..FilmFilters::default()
        };
        let result = apply_filters(&fixture(), &filters);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "3");
    }

    #[test]
    fn search_matches_description_case_insensitively() {
        let filters = FilmFilters { search: "  WOODLAND ".to_string(), ..FilmFilters::default() };
        assert_eq!(titles(&apply_filters(&fixture(), &filters)), vec!["My Neighbor Totoro"]);
    }

    #[test]
    fn values_within_a_facet_are_alternatives() {
        let filters = FilmFilters {
            years: vec!["1988".to_string(), "1995".to_string()],
            ..FilmFilters::default()
        };
        assert_eq!(
            titles(&apply_filters(&fixture(), &filters)),
            vec!["My Neighbor Totoro", "Whisper of the Heart"]
        );
    }

    #[test]
    fn empty_filters_return_input_unchanged() {
        let films = fixture();
        assert_eq!(apply_filters(&films, &FilmFilters::default()), films);
    }

    #[test]
    fn unparsable_score_fails_any_positive_threshold() {
        let mut films = fixture();
        films[0].rt_score = "unknown".to_string();
        let filters = FilmFilters { min_score: 1, ..FilmFilters::default() };
        assert_eq!(
            titles(&apply_filters(&films, &filters)),
            vec!["Spirited Away", "Whisper of the Heart"]
        );
        assert_eq!(apply_filters(&films, &FilmFilters::default()).len(), 3);
    }

    #[test]
    fn sorts_by_release_and_rating() {
        let by_release = apply_sort(&fixture(), SortOption::ReleaseDesc);
        let years: Vec<_> = by_release.iter().map(|f| f.release_date.as_str()).collect();
        assert_eq!(years, vec!["2001", "1995", "1988"]);

        let by_rating = apply_sort(&fixture(), SortOption::RatingDesc);
        let scores: Vec<_> = by_rating.iter().map(|f| f.rt_score.as_str()).collect();
        assert_eq!(scores, vec!["97", "93", "91"]);
    }

    #[test]
    fn title_sort_ignores_case() {
        let films = vec![
            film("a", "whisper", "", "", "", "", ""),
            film("b", "Arrietty", "", "", "", "", ""),
            film("c", "kiki", "", "", "", "", ""),
        ];
        assert_eq!(titles(&apply_sort(&films, SortOption::TitleAsc)), vec!["Arrietty", "kiki", "whisper"]);
    }

    #[test]
    fn sort_is_stable_and_idempotent() {
        let films = vec![
            film("a", "A", "", "", "", "1990", "90"),
            film("b", "B", "", "", "", "bad", "90"),
            film("c", "C", "", "", "", "1990", "x"),
            film("d", "D", "", "", "", "2000", "90"),
        ];

        for sort in SortOption::ALL {
            let once = apply_sort(&films, sort);
            let twice = apply_sort(&once, sort);
            assert_eq!(once, twice, "{sort:?} not idempotent");
        }

        let ids: Vec<_> = apply_sort(&films, SortOption::ReleaseDesc).into_iter().map(|f| f.id).collect();
        assert_eq!(ids, vec!["d", "a", "c", "b"]);

        let ids: Vec<_> = apply_sort(&films, SortOption::RatingDesc).into_iter().map(|f| f.id).collect();
        assert_eq!(ids, vec!["a", "b", "d", "c"]);
    }

    #[test]
    fn sort_does_not_touch_input() {
        let films = fixture();
        let before = films.clone();
        let _ = apply_sort(&films, SortOption::RatingDesc);
        assert_eq!(films, before);
    }

    #[test]
    fn paginates_and_clamps_page_numbers() {
        let page = paginate_films(&fixture(), 3, 2);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.current_page, 2);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, "3");

        let first = paginate_films(&fixture(), 0, 2);
        assert_eq!(first.current_page, 1);
        assert_eq!(first.items.len(), 2);
    }

    #[test]
    fn pagination_bounds_hold_for_any_page() {
        let films = fixture();
        for page in [i64::MIN, -10, 0, 1, 2, 3, 4, 1_000, i64::MAX] {
            for size in [1, 2, 3, 12] {
                let p = paginate_films(&films, page, size);
                assert!(p.current_page >= 1 && p.current_page <= p.total_pages);
                assert!(p.items.len() <= size);
            }
        }

        let empty = paginate_films(&[], 5, 12);
        assert_eq!(empty.total_pages, 1);
        assert_eq!(empty.current_page, 1);
        assert!(empty.items.is_empty());
    }

    #[test]
    fn filter_options_are_distinct_and_sorted() {
        let mut films = fixture();
        films.push(film("4", "Untitled", "", "", "", "", ""));
        films.push(film("5", "Ponyo", "", "Hayao Miyazaki", "Toshio Suzuki", "2008", "92"));
        films.push(film("6", "Old", "", "isao Takahata", "Toru Hara", "986", "90"));

        let options = get_filter_options(&films);
        assert_eq!(options.directors, vec!["Hayao Miyazaki", "isao Takahata", "Yoshifumi Kondō"]);
        assert_eq!(options.producers, vec!["Toru Hara", "Toshio Suzuki"]);
        assert_eq!(options.years, vec!["986", "1988", "1995", "2001", "2008"]);
    }

    #[test]
    fn catalog_view_reports_match_count_before_paging() {
        let filters = FilmFilters {
            sort: SortOption::RatingDesc,
            page_size: 2,
            page: 2,
            ..FilmFilters::default()
        };
        let (total, page) = catalog_view(&fixture(), &filters);
        assert_eq!(total, 3);
        assert_eq!(titles(&page.items), vec!["Whisper of the Heart"]);
    }
}
