use rand::seq::SliceRandom;
use rand::Rng;

const ADJECTIVES: [&str; 20] = [
    "Brave", "Kind", "Wise", "Gentle", "Strong", "Peaceful", "Hopeful",
    "Caring", "Thoughtful", "Quiet", "Bold", "Sincere", "Honest", "True",
    "Deep", "Bright", "Calm", "Free", "Open", "Pure",
];

const NOUNS: [&str; 20] = [
    "Heart", "Soul", "Mind", "Spirit", "Voice", "Light", "Hope", "Dream",
    "Journey", "Path", "Story", "Truth", "Seeker", "Wanderer", "Explorer",
    "Guardian", "Healer", "Listener", "Friend", "Companion",
];

/// Display names look like `GentleSeeker417`: adjective, noun, 0-999.
pub fn generate_anonymous_name<R: Rng + ?Sized>(rng: &mut R) -> String {
    let adjective = ADJECTIVES.choose(rng).copied().unwrap_or("Quiet");
    let noun = NOUNS.choose(rng).copied().unwrap_or("Soul");
    let number: u16 = rng.gen_range(0..1000);
    format!("{}{}{}", adjective, noun, number)
}
