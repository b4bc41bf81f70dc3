use tq_ledger::NewActivity;

/// (name, description, user_who_posted, difficulty_rating, points)
const SAMPLES: [(&str, &str, &str, f64, i64); 10] = [
    (
        "Old Rag Mountain Trail",
        "9 mile rocky steep hike with panoramic summit views.",
        "alex",
        8.7,
        250,
    ),
    (
        "Shenandoah River Kayaking",
        "Calm river paddle with light rapids.",
        "maria",
        5.5,
        140,
    ),
    (
        "Great Falls Cliff Overlook",
        "Scenic cliffside walk overlooking waterfalls.",
        "david",
        6.2,
        180,
    ),
    (
        "Downtown Artisan Cafe",
        "Cozy cafe with live music and specialty espresso drinks.",
        "sophia",
        2.0,
        30,
    ),
    (
        "Capitol Hill Food Crawl",
        "Visit 4 restaurants in one evening.",
        "ryan",
        3.8,
        90,
    ),
    (
        "Rock Creek Park Trail Run",
        "5 mile forest trail run with rolling hills.",
        "emma",
        4.5,
        110,
    ),
    (
        "Sunset Beach Walk",
        "Relaxing 2 mile sunset walk along the shoreline.",
        "liam",
        1.5,
        20,
    ),
    (
        "Indoor Rock Climbing Gym",
        "Advanced climbing routes up to V7 difficulty.",
        "noah",
        7.3,
        200,
    ),
    (
        "Historic Monument Tour",
        "Guided walking tour of 5 historic landmarks.",
        "ava",
        2.8,
        60,
    ),
    (
        "Whitewater Rafting Adventure",
        "Class III-IV rapids for adrenaline seekers.",
        "ethan",
        9.1,
        300,
    ),
];

/// Sample activities, all posted at `time_posted`.
pub fn sample_activities(time_posted: i64) -> Vec<NewActivity> {
    SAMPLES
        .iter()
        .map(|&(name, description, user, difficulty, points)| {
            NewActivity::new(name, description, user, difficulty, points).posted_at(time_posted)
        })
        .collect()
}
