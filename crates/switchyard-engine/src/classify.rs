//! Error classification.
//!
//! Graphs report low-level errors from whatever element failed. When the
//! failing element lives inside one of the shared sinks the report is
//! rewritten into something an end user can act on.

use tracing::warn;

use switchyard_core::{
    ClassifiedError, ElementPath, ErrorCategory, GraphError, GraphId, Medium, SharedSink, Severity,
};

/// Headline and explanation shown for a sink category.
fn texts(category: ErrorCategory) -> Option<(&'static str, &'static str)> {
    match category {
        ErrorCategory::VideoOutputBusy => Some((
            "Video output is busy",
            "Please check that your video output device isn't already used by another application",
        )),
        ErrorCategory::VideoOutputProblem => {
            Some(("Video output problem", "There is a problem with your video output device"))
        }
        ErrorCategory::AudioOutputBusy => Some((
            "Audio output device is busy",
            "Please check that your audio output device isn't already used by another application",
        )),
        ErrorCategory::AudioOutputProblem => {
            Some(("Audio output problem", "There is a problem with your audio output device"))
        }
        ErrorCategory::Unclassified => None,
    }
}

fn sink_category(medium: Medium, busy: bool) -> ErrorCategory {
    match (medium, busy) {
        (Medium::Video, true) => ErrorCategory::VideoOutputBusy,
        (Medium::Video, false) => ErrorCategory::VideoOutputProblem,
        (Medium::Audio, true) => ErrorCategory::AudioOutputBusy,
        (Medium::Audio, false) => ErrorCategory::AudioOutputProblem,
    }
}

/// Classify an error or warning raised by `origin` inside `graph`.
///
/// The video sink is checked before the audio sink. Classification is
/// purely diagnostic and has no effect on any graph.
#[must_use]
pub fn classify(
    severity: Severity,
    graph: GraphId,
    origin: &ElementPath,
    error: &GraphError,
    video_sink: Option<&dyn SharedSink>,
    audio_sink: Option<&dyn SharedSink>,
) -> ClassifiedError {
    warn!(
        %graph,
        %origin,
        ?severity,
        domain = ?error.domain,
        code = error.code,
        message = %error.message,
        detail = %error.detail,
        "Graph reported a problem"
    );

    let medium = [(Medium::Video, video_sink), (Medium::Audio, audio_sink)]
        .into_iter()
        .find_map(|(medium, sink)| sink.filter(|s| s.contains(origin)).map(|_| medium));

    let category = medium.map_or(ErrorCategory::Unclassified, |medium| {
        sink_category(medium, error.is_resource_busy())
    });

    let (reason, detail) = match texts(category) {
        Some((reason, detail)) => (reason.to_string(), detail.to_string()),
        None => (error.message.clone(), error.detail.clone()),
    };

    ClassifiedError { severity, category, reason, detail, graph, origin: origin.clone() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimSink;
    use switchyard_core::ErrorDomain;
    use switchyard_core::event::resource;

    fn busy() -> GraphError {
        GraphError::new(
            ErrorDomain::Resource,
            resource::BUSY,
            "Could not open device",
            "open: EBUSY",
        )
    }

    fn failed() -> GraphError {
        GraphError::new(ErrorDomain::Resource, resource::OPEN_WRITE, "Could not open device", "")
    }

    fn run(origin: &str, error: &GraphError) -> ClassifiedError {
        let video = SimSink::video("video-out");
        let audio = SimSink::audio("audio-out");
        classify(
            Severity::Error,
            GraphId::from(1),
            &ElementPath::parse(origin),
            error,
            Some(video.as_ref()),
            Some(audio.as_ref()),
        )
    }

    #[test]
    fn test_busy_video_sink() {
        let report = run("video-out/xvimagesink0", &busy());
        assert_eq!(report.category, ErrorCategory::VideoOutputBusy);
        assert_eq!(report.reason, "Video output is busy");
    }

    #[test]
    fn test_other_video_sink_error() {
        let report = run("video-out/xvimagesink0", &failed());
        assert_eq!(report.category, ErrorCategory::VideoOutputProblem);
        assert_eq!(report.detail, "There is a problem with your video output device");
    }

    #[test]
    fn test_busy_audio_sink() {
        let report = run("audio-out/alsasink0", &busy());
        assert_eq!(report.category, ErrorCategory::AudioOutputBusy);
        assert_eq!(report.reason, "Audio output device is busy");
    }

    #[test]
    fn test_other_audio_sink_error() {
        let report = run("audio-out", &failed());
        assert_eq!(report.category, ErrorCategory::AudioOutputProblem);
    }

    #[test]
    fn test_error_outside_sinks_passes_through() {
        let report = run("decodebin0/vorbisdec0", &busy());
        assert_eq!(report.category, ErrorCategory::Unclassified);
        assert_eq!(report.reason, "Could not open device");
        assert_eq!(report.detail, "open: EBUSY");
    }

    #[test]
    fn test_without_sinks_everything_is_unclassified() {
        let report = classify(
            Severity::Warning,
            GraphId::from(3),
            &ElementPath::parse("video-out/xvimagesink0"),
            &busy(),
            None,
            None,
        );
        assert_eq!(report.category, ErrorCategory::Unclassified);
        assert_eq!(report.severity, Severity::Warning);
        assert_eq!(report.graph, GraphId::from(3));
    }
}
