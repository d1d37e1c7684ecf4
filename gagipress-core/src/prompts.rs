//! Prompt templates for idea and script generation.
//!
//! The templates are written in Italian because the catalogue targets the
//! Italian Amazon marketplace. The JSON shapes at the end of each template are
//! what the generator extractors expect back.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{Book, Platform};

pub const IDEA_TEMPERATURE: f32 = 0.8;
pub const SCRIPT_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookNiche {
    Children,
    Puzzles,
    Savings,
    DialectPuzzles,
}

impl BookNiche {
    /// Keyword match on the genre, falling back to puzzles. Dialect keywords are
    /// checked before puzzle keywords.
    pub fn from_genre(genre: &str) -> Self {
        let genre = genre.to_lowercase();
        let has = |keywords: &[&str]| keywords.iter().any(|keyword| genre.contains(keyword));
        if has(&["children", "bambini", "kids"]) {
            BookNiche::Children
        } else if has(&["dialect", "dialetto", "milanese"]) {
            BookNiche::DialectPuzzles
        } else if has(&["puzzle", "enigmi", "quiz"]) {
            BookNiche::Puzzles
        } else if has(&["saving", "risparmio", "money"]) {
            BookNiche::Savings
        } else {
            BookNiche::Puzzles
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookNiche::Children => "children",
            BookNiche::Puzzles => "puzzles",
            BookNiche::Savings => "savings",
            BookNiche::DialectPuzzles => "dialect_puzzles",
        }
    }

    fn guidelines(&self) -> &'static str {
        match self {
            BookNiche::Children => CHILDREN_GUIDELINES,
            BookNiche::Puzzles => PUZZLE_GUIDELINES,
            BookNiche::Savings => SAVINGS_GUIDELINES,
            BookNiche::DialectPuzzles => DIALECT_GUIDELINES,
        }
    }
}

impl fmt::Display for BookNiche {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const CHILDREN_GUIDELINES: &str = "LINEE GUIDA per libri per bambini:
- Mostra momenti divertenti di lettura con i bambini
- Behind-the-scenes della creazione delle illustrazioni
- Consigli educativi per genitori
- Tutorial creativi ispirati al libro
- Storie animate delle pagine del libro
- Testimonianze di genitori e bambini";

const PUZZLE_GUIDELINES: &str = "LINEE GUIDA per libri di enigmistica:
- Sfide e quiz interattivi dal libro
- Time-lapse di risoluzione enigmi
- Curiosità e trucchi per enigmisti
- Confronti \"prima vs dopo\" della mente
- Mini-sfide con premio (engagement)
- Spiegazione di enigmi particolarmente difficili";

const DIALECT_GUIDELINES: &str = "LINEE GUIDA per enigmistica in dialetto milanese:
- Parole milanesi dimenticate con spiegazioni divertenti
- Confronto dialetto vs italiano standard
- Quiz su modi di dire milanesi
- Storielle brevi in dialetto
- Nostalgia e tradizioni milanesi
- Coinvolgimento community milanese";

const SAVINGS_GUIDELINES: &str = "LINEE GUIDA per libri sul risparmio:
- Tips pratici di risparmio giornaliero
- Testimonianze di successo
- Sfide di risparmio da provare
- Errori comuni da evitare
- Trucchi psicologici per risparmiare
- Confronto spesa prima/dopo consigli del libro";

const IDEA_CATEGORIES: &str = r#"CATEGORIE di contenuto (distribuisci equamente):
1. EDUCATIONAL: insegna qualcosa di utile
2. ENTERTAINMENT: diverte e intrattiene
3. BTS (Behind-The-Scenes): mostra il processo creativo
4. UGC (User Generated Content): coinvolge gli utenti
5. TREND: cavalca trend attuali di TikTok/Instagram

Per ogni idea, fornisci:
1. Tipo (educational/entertainment/bts/ugc/trend)
2. Titolo accattivante (max 10 parole)
3. Descrizione breve (2-3 frasi)
4. Hook iniziale suggerito
5. CTA finale suggerito
6. Punteggio rilevanza 0-100

Formato risposta (JSON array):
[
  {
    "type": "educational",
    "title": "Titolo idea",
    "description": "Descrizione dettagliata dell'idea",
    "hook": "Hook iniziale per catturare attenzione",
    "cta": "Call-to-action finale",
    "relevance_score": 85
  },
  ...
]"#;

const TIKTOK_SPECS: &str = "SPECIFICHE TIKTOK:
- Durata: 15-60 secondi
- Hook: primi 3 secondi CRITICI
- Ritmo: veloce, dinamico
- Formato: verticale 9:16
- Trend: usa musiche popolari
- Hashtag: 3-5 rilevanti + 2-3 di nicchia";

const INSTAGRAM_SPECS: &str = "SPECIFICHE INSTAGRAM REELS:
- Durata: 15-90 secondi
- Hook: primi 3 secondi CRITICI
- Ritmo: medio-veloce
- Formato: verticale 9:16
- Audio: trending o originale
- Hashtag: 5-10 misti (popolari + nicchia)";

pub fn idea_prompt(book: &Book, niche: BookNiche, count: usize) -> String {
    format!(
        "Sei un esperto di social media marketing per libri self-published su Amazon KDP.

Il libro: \"{title}\"
Genere: {genre}
Target: {audience}

Devi generare {count} idee creative per contenuti TikTok/Instagram Reels che promuovano questo libro.

{guidelines}

{categories}",
        title = book.title,
        genre = book.genre,
        audience = book.target_audience(),
        guidelines = niche.guidelines(),
        categories = IDEA_CATEGORIES,
    )
}

/// `amazon_url` may be empty when the book has no ASIN.
pub fn script_prompt(
    idea: &str,
    book_title: &str,
    platform: Platform,
    amazon_url: &str,
) -> String {
    let specs = match platform {
        Platform::Tiktok => TIKTOK_SPECS,
        Platform::Instagram => INSTAGRAM_SPECS,
    };
    format!(
        r##"Sei un copywriter esperto di TikTok e Instagram Reels.

Idea da trasformare in script:
"{idea}"

Libro promosso: "{book_title}"
Platform: {platform}

{specs}

Crea uno script completo strutturato così:

**HOOK (3-5 secondi)**
La frase/domanda che ferma lo scroll. Deve essere:
- Provocatoria o curiosa
- Relazionabile al target
- Chiara e diretta

**CONTENUTO PRINCIPALE (25-45 secondi)**
- Sviluppa l'idea in 3-5 punti chiave
- Linguaggio semplice e diretto
- Usa "tu" per parlare direttamente al viewer
- Include dettagli specifici e concreti

**CTA (5-10 secondi)**
- Invito all'azione chiaro
- Perché dovrebbero comprare il libro
- Link diretto: {amazon_url}
- Menziona sia "link in bio" sia il link Amazon diretto

**EXTRA**
- 5-8 hashtag strategici
- Suggerimento musica/audio trending
- Note per il montaggio video

Formato risposta (JSON):
{{
  "hook": "Hook text qui",
  "main_content": "Contenuto principale qui (separato in paragrafi)",
  "cta": "CTA text qui",
  "hashtags": ["#tag1", "#tag2", ...],
  "music_suggestion": "Nome traccia/audio trending",
  "video_notes": "Note per editing e montaggio",
  "estimated_length": 45
}}"##
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(genre: &str) -> Book {
        Book {
            id: "book-1".into(),
            title: "Enigmi della Nonna".into(),
            genre: genre.into(),
            target_audience: Some("adulti".into()),
            kdp_asin: None,
            cover_image_url: None,
            publication_date: None,
            current_rank: None,
            total_sales: 0,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn niche_detection_is_case_insensitive() {
        assert_eq!(BookNiche::from_genre("Libri per Bambini"), BookNiche::Children);
        assert_eq!(
            BookNiche::from_genre("Enigmistica in Dialetto"),
            BookNiche::DialectPuzzles
        );
        assert_eq!(
            BookNiche::from_genre("Puzzle in milanese"),
            BookNiche::DialectPuzzles
        );
        assert_eq!(BookNiche::from_genre("Enigmistica"), BookNiche::Puzzles);
        assert_eq!(BookNiche::from_genre("Money management"), BookNiche::Savings);
        assert_eq!(BookNiche::from_genre("Cookbook"), BookNiche::Puzzles);
    }

    #[test]
    fn idea_prompt_embeds_book_and_count() {
        let prompt = idea_prompt(&book("puzzle"), BookNiche::Puzzles, 12);
        assert!(prompt.contains("Il libro: \"Enigmi della Nonna\""));
        assert!(prompt.contains("Target: adulti"));
        assert!(prompt.contains("generare 12 idee"));
        assert!(prompt.contains("LINEE GUIDA per libri di enigmistica"));
        assert!(prompt.contains("\"relevance_score\": 85"));
    }

    #[test]
    fn script_prompt_selects_platform_specs() {
        let prompt = script_prompt(
            "Quiz: tre enigmi",
            "Enigmi della Nonna",
            Platform::Instagram,
            "https://www.amazon.it/dp/B0TEST",
        );
        assert!(prompt.contains("SPECIFICHE INSTAGRAM REELS"));
        assert!(!prompt.contains("SPECIFICHE TIKTOK"));
        assert!(prompt.contains("Platform: instagram"));
        assert!(prompt.contains("Link diretto: https://www.amazon.it/dp/B0TEST"));
        assert!(prompt.contains("\"estimated_length\": 45\n}"));
    }

    #[test]
    fn script_prompt_keeps_hashtag_example_intact() {
        let prompt = script_prompt("Idea", "Libro", Platform::Tiktok, "");
        assert!(prompt.contains("  \"hashtags\": [\"#tag1\", \"#tag2\", ...],\n"));
        assert!(prompt.contains("\"music_suggestion\": \"Nome traccia/audio trending\""));
        assert!(prompt.contains("Link diretto: \n"));
    }
}
