//! Static discovery catalog: category term lists, the curated seed handle
//! list, and trend-oriented search terms. Configuration, not persisted.

pub struct DiscoveryCategory {
    pub name: &'static str,
    pub terms: &'static [&'static str],
}

pub const CATEGORIES: &[DiscoveryCategory] = &[
    DiscoveryCategory {
        name: "Tech Reviews",
        terms: &[
            "smartphone review", "laptop review", "tech unboxing", "gadget review",
            "apple review", "samsung review", "google pixel", "oneplus review",
            "gaming laptop", "macbook review", "iphone review", "android review",
            "tech news", "ces 2024", "tech trends", "best phone", "tech tips",
            "wireless earbuds", "smartwatch review", "tablet review", "camera review",
        ],
    },
    DiscoveryCategory {
        name: "Programming",
        terms: &[
            "programming tutorial", "coding", "python tutorial", "javascript",
            "react tutorial", "web development", "software development",
            "machine learning", "ai tutorial", "data science", "cybersecurity",
            "devops", "cloud computing", "aws tutorial", "docker tutorial",
            "kubernetes", "nodejs", "java tutorial", "c++ programming",
        ],
    },
    DiscoveryCategory {
        name: "Gaming",
        terms: &[
            "minecraft", "fortnite", "valorant", "league of legends", "apex legends",
            "call of duty", "fifa", "gta", "among us", "fall guys", "rocket league",
            "overwatch", "cs go", "dota 2", "world of warcraft", "roblox",
            "pokemon", "zelda", "mario", "nintendo", "xbox", "playstation",
            "gaming news", "game review", "gaming tips", "speedrun", "esports",
            "twitch highlights", "gaming montage", "let's play", "horror games",
        ],
    },
    DiscoveryCategory {
        name: "Education",
        terms: &[
            "math tutorial", "physics", "chemistry", "biology", "history",
            "language learning", "english", "spanish", "french", "chinese",
            "online course", "khan academy", "crash course", "ted talk",
            "science experiment", "documentary", "how to", "diy tutorial",
            "study tips", "exam preparation", "college prep", "homework help",
        ],
    },
    DiscoveryCategory {
        name: "Entertainment",
        terms: &[
            "comedy", "funny videos", "pranks", "reaction", "memes",
            "music", "cover song", "original song", "music production",
            "movie review", "tv show", "netflix", "disney", "marvel",
            "anime", "manga", "k-pop", "pop music", "rock music",
            "stand up comedy", "sketch comedy", "parody", "viral videos",
        ],
    },
    DiscoveryCategory {
        name: "Lifestyle",
        terms: &[
            "vlog", "daily vlog", "travel", "travel vlog", "food",
            "cooking", "recipe", "baking", "restaurant review",
            "fashion", "beauty", "makeup", "skincare", "hairstyle",
            "fitness", "workout", "yoga", "meditation", "health",
            "home decor", "interior design", "organization", "minimalism",
        ],
    },
    DiscoveryCategory {
        name: "Business",
        terms: &[
            "business", "entrepreneurship", "startup", "investing",
            "stock market", "cryptocurrency", "bitcoin", "trading",
            "real estate", "marketing", "personal finance", "money",
            "economics", "passive income", "side hustle", "freelancing",
            "dropshipping", "affiliate marketing", "digital marketing",
        ],
    },
    DiscoveryCategory {
        name: "News",
        terms: &[
            "news", "politics", "current events", "breaking news",
            "world news", "local news", "commentary", "analysis",
            "debate", "opinion", "journalism", "interview",
            "political commentary", "news analysis", "fact check",
        ],
    },
    DiscoveryCategory {
        name: "Hobbies",
        terms: &[
            "photography", "art", "drawing", "painting", "crafts",
            "gardening", "plants", "pets", "dogs", "cats",
            "cars", "automotive", "motorcycles", "aviation",
            "sports", "football", "basketball", "soccer", "tennis",
            "fishing", "camping", "hiking", "woodworking", "model building",
        ],
    },
];

/// Proven popular handles used for bootstrap seeding.
pub const SEED_HANDLES: &[&str] = &[
    // Tech
    "@mkbhd", "@unboxtherapy", "@ijustine", "@dave2d", "@austin",
    "@techlinked", "@gamersNexus", "@jayztwocents", "@linustechtips",
    // Education
    "@veritasium", "@3blue1brown", "@khanacademy", "@crashcourse",
    "@tedx", "@vsauce", "@scishow", "@minutephysics", "@numberphile",
    // Gaming
    "@pewdiepie", "@mrbeast", "@jacksepticeye", "@markiplier",
    "@ninja", "@tfue", "@pokimane", "@shroud", "@summit1g",
    // Entertainment
    "@comedycentral", "@snl", "@thetonightshow", "@lastweektonight",
    "@collegehumor", "@smosh", "@goodmythicalmorning",
    // Music
    "@taylorswift", "@justinbieber", "@arianagrande", "@edsheeran",
    "@billboard", "@vevo", "@spinnin", "@trapnation",
    // Business and finance
    "@cnbc", "@bloomberg", "@grahamstephan", "@andrei_jikh",
    "@meetkevin", "@biggerpockets",
];

/// Trend-oriented terms for finding currently popular channels.
pub const TRENDING_TERMS: &[&str] = &[
    "viral", "trending", "popular", "2024 best", "top 10",
    "million views", "breaking", "latest", "new channel",
    "rising star", "up and coming", "small youtuber",
];

/// Random sample of `count` categories.
pub fn sample_categories(count: usize) -> Vec<&'static DiscoveryCategory> {
    let mut indices: Vec<usize> = (0..CATEGORIES.len()).collect();
    fastrand::shuffle(&mut indices);
    indices
        .into_iter()
        .take(count)
        .map(|i| &CATEGORIES[i])
        .collect()
}

/// Random sample of `count` terms from one category.
pub fn sample_terms(category: &DiscoveryCategory, count: usize) -> Vec<String> {
    let mut terms: Vec<&str> = category.terms.to_vec();
    fastrand::shuffle(&mut terms);
    terms.into_iter().take(count).map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_categories_bounds() {
        assert_eq!(sample_categories(4).len(), 4);
        assert_eq!(sample_categories(100).len(), CATEGORIES.len());
    }

    #[test]
    fn test_sample_terms_come_from_category() {
        let category = &CATEGORIES[0];
        let sampled = sample_terms(category, 6);
        assert_eq!(sampled.len(), 6);
        for term in &sampled {
            assert!(category.terms.contains(&term.as_str()));
        }
    }

    #[test]
    fn test_catalog_is_populated() {
        assert!(CATEGORIES.len() >= 5);
        for category in CATEGORIES {
            assert!(!category.terms.is_empty(), "{} has no terms", category.name);
        }
        assert!(SEED_HANDLES.len() >= 40);
        assert!(!TRENDING_TERMS.is_empty());
    }
}
