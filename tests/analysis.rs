use lemm_core::{analysis::DEFAULT_TEMPO, lyrics_for_clip, PromptAnalyzer};

#[test]
fn analyze_extracts_attributes() {
    let a = PromptAnalyzer::new().analyze("Upbeat jazz with piano at 128 BPM in A minor");
    assert_eq!(a.genre, "Jazz");
    assert_eq!(a.mood, "Upbeat");
    assert_eq!(a.tempo, 128);
    assert_eq!(a.key, "A Minor");
    assert_eq!(a.instruments, vec!["piano".to_string()]);
    assert_eq!(a.style, "Modern Jazz");
    assert_eq!(a.raw_prompt, "Upbeat jazz with piano at 128 BPM in A minor");
}

#[test]
fn analyze_falls_back_to_defaults() {
    let a = PromptAnalyzer::new().analyze("something nice");
    assert_eq!(a.genre, "Pop");
    assert_eq!(a.mood, "Neutral");
    assert_eq!(a.tempo, DEFAULT_TEMPO);
    assert_eq!(a.key, "C Major");
    assert_eq!(a.instruments, vec!["guitar", "drums", "bass"]);
}

#[test]
fn tempo_words_set_tempo() {
    let analyzer = PromptAnalyzer::new();
    assert_eq!(analyzer.analyze("a calm evening").tempo, 80);
    assert_eq!(analyzer.analyze("something fast").tempo, 140);
    assert_eq!(analyzer.analyze("fast but exactly 96bpm").tempo, 96);
}

#[test]
fn hyphenated_genres_are_title_cased() {
    let a = PromptAnalyzer::new().analyze("dusty hip-hop beats with sax");
    assert_eq!(a.genre, "Hip-Hop");
    assert_eq!(a.instruments, vec!["saxophone".to_string()]);
}

#[test]
fn style_follows_keywords() {
    let analyzer = PromptAnalyzer::new();
    assert_eq!(analyzer.analyze("acoustic folk").style, "Acoustic");
    assert_eq!(analyzer.analyze("retro funk").style, "Vintage/Retro");
}

#[test]
fn key_with_accidental() {
    let a = PromptAnalyzer::new().analyze("ballad in F# Major");
    assert_eq!(a.key, "F# Major");
}

#[test]
fn tempo_and_key_tolerate_loose_spacing() {
    let a = PromptAnalyzer::new().analyze("jazz at 90\tbpm in Ebminor");
    assert_eq!(a.tempo, 90);
    assert_eq!(a.key, "Eb Minor");

    let b = PromptAnalyzer::new().analyze("techno, 132   BPM, g MAJOR");
    assert_eq!(b.tempo, 132);
    assert_eq!(b.key, "G Major");
}

#[test]
fn caption_describes_vocals_and_tempo() {
    let a = PromptAnalyzer::new().analyze("sad rock song");
    let caption = a.caption("sad rock song", false);
    assert!(caption.starts_with("sad rock song. Rock music"));
    assert!(caption.contains("Sad mood"));
    assert!(caption.contains("medium tempo"));
    assert!(caption.ends_with("instrumental"));
    assert!(a.caption("sad rock song", true).ends_with("with vocals"));
}

#[test]
fn lyrics_split_into_contiguous_runs() {
    let lyrics = "a1\na2\n\nb1\n\nc1\n\nd1";
    assert_eq!(lyrics_for_clip(lyrics, 0, 2), "a1\na2\n\nb1");
    assert_eq!(lyrics_for_clip(lyrics, 1, 2), "c1\n\nd1");

    let three = "a\n\nb\n\nc";
    assert_eq!(lyrics_for_clip(three, 0, 2), "a");
    assert_eq!(lyrics_for_clip(three, 1, 2), "b\n\nc");
}

#[test]
fn lyrics_repeat_when_clips_outnumber_sections() {
    let lyrics = "verse\n\nchorus";
    let parts: Vec<String> = (0..3).map(|i| lyrics_for_clip(lyrics, i, 3)).collect();
    assert_eq!(parts, vec!["verse", "chorus", "verse"]);
}

#[test]
fn blank_lyrics_give_empty_slices() {
    assert_eq!(lyrics_for_clip("", 0, 3), "");
    assert_eq!(lyrics_for_clip("  \n\n ", 2, 3), "");
}
