use streamgate_core::MediaClass;

use crate::error::UpstreamError;

/// One cacheable query against the upstream content provider.
///
/// Playback URLs are not requests: they are computed locally and never
/// cached, see [`UpstreamProvider::playback_url`](crate::UpstreamProvider::playback_url).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UpstreamRequest {
    /// End-user account and subscription details.
    Profile,
    /// Category taxonomy for one media class.
    Categories(MediaClass),
    /// Catalog items, optionally restricted to a category.
    Items {
        media: MediaClass,
        category: Option<String>,
    },
    /// Full metadata for one movie.
    MovieDetail { movie_id: String },
    /// Full metadata for one series, including seasons.
    SeriesDetail { series_id: String },
    /// Programme guide for a live channel.
    Guide { channel_id: String },
}

fn normalized(value: &str) -> String {
    value.trim().to_owned()
}

impl UpstreamRequest {
    /// Items request with a blank category treated as no filter.
    pub fn items(media: MediaClass, category: Option<&str>) -> Self {
        let category = category.map(normalized).filter(|c| !c.is_empty());
        Self::Items { media, category }
    }

    /// Detail request for a movie or series.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::InvalidRequest`] for live media, which has no
    /// item detail, or for a blank id.
    pub fn item_detail(media: MediaClass, item_id: &str) -> Result<Self, UpstreamError> {
        let id = normalized(item_id);
        if id.is_empty() {
            return Err(UpstreamError::InvalidRequest("item id is empty".into()));
        }
        match media {
            MediaClass::Movies => Ok(Self::MovieDetail { movie_id: id }),
            MediaClass::Series => Ok(Self::SeriesDetail { series_id: id }),
            MediaClass::Live => Err(UpstreamError::InvalidRequest(
                "live channels have no item detail".into(),
            )),
        }
    }

    /// Guide request for a live channel.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::InvalidRequest`] for a blank channel id.
    pub fn guide(channel_id: &str) -> Result<Self, UpstreamError> {
        let id = normalized(channel_id);
        if id.is_empty() {
            return Err(UpstreamError::InvalidRequest("channel id is empty".into()));
        }
        Ok(Self::Guide { channel_id: id })
    }

    /// Stable operation name, used in cache keys and logs.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Profile => "user_info",
            Self::Categories(MediaClass::Live) => "live_categories",
            Self::Categories(MediaClass::Movies) => "movie_categories",
            Self::Categories(MediaClass::Series) => "series_categories",
            Self::Items {
                media: MediaClass::Live,
                ..
            } => "live_channels",
            Self::Items {
                media: MediaClass::Movies,
                ..
            } => "movies",
            Self::Items {
                media: MediaClass::Series,
                ..
            } => "series",
            Self::MovieDetail { .. } => "movie_info",
            Self::SeriesDetail { .. } => "series_info",
            Self::Guide { .. } => "epg",
        }
    }

    /// The media class this request belongs to, if any.
    pub fn media(&self) -> Option<MediaClass> {
        match self {
            Self::Profile => None,
            Self::Categories(media) | Self::Items { media, .. } => Some(*media),
            Self::MovieDetail { .. } => Some(MediaClass::Movies),
            Self::SeriesDetail { .. } => Some(MediaClass::Series),
            Self::Guide { .. } => Some(MediaClass::Live),
        }
    }

    /// Operation parameters as name/value pairs, sorted by name.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::Profile | Self::Categories(_) => Vec::new(),
            Self::Items { category, .. } => category
                .iter()
                .map(|c| ("category_id", c.clone()))
                .collect(),
            Self::MovieDetail { movie_id } => vec![("vod_id", movie_id.clone())],
            Self::SeriesDetail { series_id } => vec![("series_id", series_id.clone())],
            Self::Guide { channel_id } => vec![("stream_id", channel_id.clone())],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_category_means_no_filter() {
        assert_eq!(
            UpstreamRequest::items(MediaClass::Movies, Some("  ")),
            UpstreamRequest::items(MediaClass::Movies, None)
        );
        assert_eq!(
            UpstreamRequest::items(MediaClass::Movies, Some(" 12 ")).params(),
            vec![("category_id", "12".to_owned())]
        );
    }

    #[test]
    fn live_has_no_item_detail() {
        assert!(matches!(
            UpstreamRequest::item_detail(MediaClass::Live, "7"),
            Err(UpstreamError::InvalidRequest(_))
        ));
        assert_eq!(
            UpstreamRequest::item_detail(MediaClass::Series, "9")
                .unwrap()
                .operation(),
            "series_info"
        );
    }

    #[test]
    fn operation_names_are_distinct() {
        let reqs = [
            UpstreamRequest::Profile,
            UpstreamRequest::Categories(MediaClass::Live),
            UpstreamRequest::Categories(MediaClass::Movies),
            UpstreamRequest::Categories(MediaClass::Series),
            UpstreamRequest::items(MediaClass::Live, None),
            UpstreamRequest::items(MediaClass::Movies, None),
            UpstreamRequest::items(MediaClass::Series, None),
            UpstreamRequest::item_detail(MediaClass::Movies, "1").unwrap(),
            UpstreamRequest::item_detail(MediaClass::Series, "1").unwrap(),
            UpstreamRequest::guide("1").unwrap(),
        ];
        let mut names: Vec<_> = reqs.iter().map(UpstreamRequest::operation).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), reqs.len());
    }
}
