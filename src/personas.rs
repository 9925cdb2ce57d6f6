//! Personas de cliente derivadas de patrones reales de las reseñas.

use crate::models::Persona;

const PERSONA_DEFINITIONS: [(&str, &str); 6] = [
    (
        "Budget-Conscious Shopper",
        "A practical customer who looks for value and worries about waste. Based on reviews mentioning 'waste of money' and disappointment, asks questions like 'Is this worth it?', 'Will I regret buying this?', 'Does this justify the cost?', and 'Are there better alternatives for the price?'. Often concerned about products that 'constantly fail' or have poor quality.",
    ),
    (
        "Tech Enthusiast",
        "An advanced user focused on specific technical features like facial recognition, fast charging, automation capabilities, app integration, and performance. Reviews show interest in features working 'perfectly' and being 'exceptional'. Asks 'How well does the facial recognition work?', 'Is the fast charging reliable?', 'How's the app integration?', and 'Does the automation work as advertised?'",
    ),
    (
        "First-Time Buyer",
        "A newcomer seeking simple guidance and avoiding complex issues. Based on reviews mentioning ease of use and setup process, asks basic questions like 'Which laptop is good for beginners?', 'What's the easiest to set up?', 'Is this user-friendly?', and 'What should a first-time buyer know about wearables?'. Wants products that are 'amazing' and 'work perfectly' without complications.",
    ),
    (
        "Quality-Focused Customer",
        "A reliability-conscious buyer concerned about long-term performance and build quality. Reviews show complaints about products that 'stopped working properly' or have 'poor build quality'. Asks 'How's the build quality?', 'Does this last long?', 'Do people have durability issues?', and 'Is this reliable over time?'. Values products with 'exceptional' quality and 'top-notch' construction.",
    ),
    (
        "Comparison Shopper",
        "A thorough researcher who wants to understand relative performance before deciding. Based on reviews comparing products and mentioning 'exceeded expectations', asks 'How does this compare to other smartphones?', 'Which is better - this laptop or others?', 'What are the pros and cons compared to alternatives?', and 'Which wearable gives the best overall experience?'",
    ),
    (
        "Feature-Focused User",
        "A user interested in specific functionality like battery life, sound quality, comfort, microphone performance, health tracking, and connectivity. Reviews show detailed mentions of features 'working perfectly' or 'being frustrating'. Asks 'How's the battery life?', 'Is the sound quality good?', 'How comfortable is it?', 'Does the microphone work well?', and 'How accurate is the health tracking?'",
    ),
];

/// Las seis personas fijas, listas para el generador de testsets.
pub fn ecommerce_personas() -> Vec<Persona> {
    PERSONA_DEFINITIONS
        .iter()
        .map(|(name, description)| Persona {
            name: name.to_string(),
            role_description: description.to_string(),
        })
        .collect()
}

pub fn persona_names() -> Vec<String> {
    PERSONA_DEFINITIONS.iter().map(|(name, _)| name.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn there_are_six_distinct_personas() {
        let personas = ecommerce_personas();
        assert_eq!(personas.len(), 6);

        let mut names = persona_names();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 6);
        assert!(personas.iter().all(|p| !p.role_description.is_empty()));
    }
}
