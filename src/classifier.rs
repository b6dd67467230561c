// src/classifier.rs - Static hand pose classification from a single frame of landmarks
use crate::landmarks::{HandLandmark as L, HandObservation, Handedness};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureLabel {
    Up,
    Down,
    Left,
    Right,
    Fist,
    Ok,
    Two,
    Call,
    None,
}

impl GestureLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
            Self::Fist => "fist",
            Self::Ok => "ok",
            Self::Two => "two",
            Self::Call => "call",
            Self::None => "none",
        }
    }

    pub fn is_none(&self) -> bool {
        *self == Self::None
    }
}

impl fmt::Display for GestureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Distance thresholds, in normalized image units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierThresholds {
    /// Thumb tip must be closer than this to the ring MCP for a fist.
    pub fist_thumb_ring_mcp_max: f64,
    /// Thumb tip to index tip pinch distance for ok.
    pub ok_pinch_max: f64,
    /// Thumb tip must be farther than this from the index MCP for left.
    pub left_thumb_index_mcp_min: f64,
    pub call_pinky_thumb_min: f64,
    pub call_pinky_ring_mcp_min: f64,
    pub two_index_middle_max: f64,
    pub two_thumb_ring_max: f64,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            fist_thumb_ring_mcp_max: 0.15,
            ok_pinch_max: 0.05,
            left_thumb_index_mcp_min: 0.1,
            call_pinky_thumb_min: 0.2,
            call_pinky_ring_mcp_min: 0.14,
            two_index_middle_max: 0.08,
            two_thumb_ring_max: 0.08,
        }
    }
}

type Predicate = fn(&HandObservation, &ClassifierThresholds) -> bool;

/// Evaluation order. Poses overlap, so the first match wins.
const PRIORITY: [(GestureLabel, Predicate); 8] = [
    (GestureLabel::Up, is_thumb_up),
    (GestureLabel::Down, is_thumb_down),
    (GestureLabel::Fist, is_fist),
    (GestureLabel::Ok, is_ok),
    (GestureLabel::Left, is_thumb_left),
    (GestureLabel::Right, is_thumb_right),
    (GestureLabel::Call, is_call),
    (GestureLabel::Two, is_two),
];

pub fn classify(hand: Option<&HandObservation>, thresholds: &ClassifierThresholds) -> GestureLabel {
    let Some(hand) = hand else {
        return GestureLabel::None;
    };

    PRIORITY
        .iter()
        .find(|(_, predicate)| predicate(hand, thresholds))
        .map(|(label, _)| *label)
        .unwrap_or(GestureLabel::None)
}

/// Labels of every predicate that holds, in priority order. Used for diagnostics.
pub fn matching_labels(
    hand: &HandObservation,
    thresholds: &ClassifierThresholds,
) -> Vec<GestureLabel> {
    PRIORITY
        .iter()
        .filter(|(_, predicate)| predicate(hand, thresholds))
        .map(|(label, _)| *label)
        .collect()
}

/// Index finger raised above every other fingertip, right hand only.
/// Gates the trajectory tracker.
pub fn pointing_gate(hand: &HandObservation) -> bool {
    if hand.handedness != Handedness::Right {
        return false;
    }
    let others = [L::ThumbTip, L::MiddleTip, L::RingTip, L::PinkyTip]
        .iter()
        .map(|lm| hand.y(*lm))
        .fold(f64::INFINITY, f64::min);
    hand.y(L::IndexTip) < others
}

fn strictly_increasing(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] < w[1])
}

fn strictly_decreasing(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] > w[1])
}

fn highest_tip(hand: &HandObservation, tips: &[L]) -> f64 {
    tips.iter().map(|lm| hand.y(*lm)).fold(f64::INFINITY, f64::min)
}

fn lowest_tip(hand: &HandObservation, tips: &[L]) -> f64 {
    tips.iter().map(|lm| hand.y(*lm)).fold(f64::NEG_INFINITY, f64::max)
}

fn is_thumb_up(hand: &HandObservation, _: &ClassifierThresholds) -> bool {
    strictly_increasing(&[
        hand.y(L::ThumbTip),
        hand.y(L::ThumbIp),
        hand.y(L::ThumbMcp),
        hand.y(L::IndexMcp),
        hand.y(L::PinkyMcp),
    ]) && hand.x(L::PinkyTip) < hand.x(L::PinkyPip)
}

fn is_thumb_down(hand: &HandObservation, _: &ClassifierThresholds) -> bool {
    let chain = strictly_decreasing(&[
        hand.y(L::ThumbTip),
        hand.y(L::ThumbIp),
        hand.y(L::ThumbMcp),
        hand.y(L::IndexMcp),
        hand.y(L::PinkyMcp),
    ]);
    if !chain {
        return false;
    }
    // splayed fingers reaching past the knuckles are not a thumbs-down
    let max_mcp_x = L::FINGER_MCPS
        .iter()
        .map(|lm| hand.x(*lm))
        .fold(f64::NEG_INFINITY, f64::max);
    L::FINGER_TIPS.iter().all(|tip| hand.x(*tip) <= max_mcp_x)
}

fn is_fist(hand: &HandObservation, t: &ClassifierThresholds) -> bool {
    let tips_and_thumb = [L::ThumbIp, L::IndexTip, L::MiddleTip, L::RingTip, L::PinkyTip];
    highest_tip(hand, &tips_and_thumb) > hand.mcp_line()
        && hand.distance(L::RingMcp, L::ThumbTip) < t.fist_thumb_ring_mcp_max
}

fn is_ok(hand: &HandObservation, t: &ClassifierThresholds) -> bool {
    hand.distance(L::ThumbTip, L::IndexTip) < t.ok_pinch_max
        && lowest_tip(hand, &[L::MiddleTip, L::RingTip, L::PinkyTip]) < hand.mcp_line()
}

fn fingers_curled_below_wrist_line(hand: &HandObservation) -> bool {
    let mcp_line = hand.mcp_line();
    highest_tip(hand, &L::FINGER_TIPS) > mcp_line && mcp_line < hand.y(L::Wrist)
}

fn is_thumb_left(hand: &HandObservation, t: &ClassifierThresholds) -> bool {
    strictly_decreasing(&[hand.x(L::ThumbTip), hand.x(L::ThumbIp), hand.x(L::ThumbMcp)])
        && fingers_curled_below_wrist_line(hand)
        && hand.y(L::ThumbCmc) > hand.y(L::PinkyMcp)
        && hand.distance(L::IndexMcp, L::ThumbTip) > t.left_thumb_index_mcp_min
        && hand.y(L::IndexMcp) < hand.y(L::Wrist)
}

fn is_thumb_right(hand: &HandObservation, _: &ClassifierThresholds) -> bool {
    strictly_increasing(&[
        hand.x(L::ThumbTip),
        hand.x(L::ThumbIp),
        hand.x(L::ThumbMcp),
        hand.x(L::ThumbCmc),
    ]) && fingers_curled_below_wrist_line(hand)
        && hand.y(L::ThumbTip) < hand.y(L::Wrist)
}

fn is_call(hand: &HandObservation, t: &ClassifierThresholds) -> bool {
    highest_tip(hand, &[L::IndexTip, L::MiddleTip, L::RingTip]) > hand.mcp_line()
        && hand.distance(L::PinkyTip, L::ThumbTip) > t.call_pinky_thumb_min
        && hand.distance(L::PinkyTip, L::RingMcp) > t.call_pinky_ring_mcp_min
}

fn is_two(hand: &HandObservation, t: &ClassifierThresholds) -> bool {
    hand.y(L::PinkyTip) > hand.y(L::RingMcp)
        && hand.y(L::RingTip) > hand.y(L::MiddleMcp)
        && hand.distance(L::IndexTip, L::MiddleTip) < t.two_index_middle_max
        && hand.distance(L::ThumbTip, L::RingTip) < t.two_thumb_ring_max
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn label(hand: &HandObservation) -> GestureLabel {
        classify(Some(hand), &ClassifierThresholds::default())
    }

    #[test]
    fn absent_hand_is_none() {
        assert_eq!(classify(None, &ClassifierThresholds::default()), GestureLabel::None);
    }

    #[test]
    fn recognizes_each_pose() {
        let cases = [
            (thumbs_up(), GestureLabel::Up),
            (thumbs_down(), GestureLabel::Down),
            (fist(), GestureLabel::Fist),
            (ok_sign(), GestureLabel::Ok),
            (thumb_left(), GestureLabel::Left),
            (thumb_right(), GestureLabel::Right),
            (call_sign(), GestureLabel::Call),
            (two_fingers(), GestureLabel::Two),
        ];
        let t = ClassifierThresholds::default();
        for (hand, expected) in cases {
            assert_eq!(label(&hand), expected, "matches: {:?}", matching_labels(&hand, &t));
        }
    }

    #[test]
    fn fixtures_match_a_single_predicate() {
        let t = ClassifierThresholds::default();
        let hands = [
            thumbs_up(),
            thumbs_down(),
            fist(),
            ok_sign(),
            thumb_left(),
            thumb_right(),
            call_sign(),
            two_fingers(),
        ];
        for hand in hands {
            let matches = matching_labels(&hand, &t);
            assert_eq!(matches.len(), 1, "{:?}", matches);
        }
    }

    #[test]
    fn pointing_pose_matches_nothing() {
        assert_eq!(label(&pointing()), GestureLabel::None);
    }

    #[test]
    fn degenerate_hand_matches_nothing() {
        assert_eq!(label(&HandBuilder::new().build()), GestureLabel::None);
    }

    #[test]
    fn fist_wins_over_call_when_both_hold() {
        // loosen call so the fist fixture also satisfies it
        let t = ClassifierThresholds {
            call_pinky_thumb_min: 0.0,
            call_pinky_ring_mcp_min: 0.0,
            ..ClassifierThresholds::default()
        };
        let hand = fist();
        assert_eq!(matching_labels(&hand, &t), vec![GestureLabel::Fist, GestureLabel::Call]);
        assert_eq!(classify(Some(&hand), &t), GestureLabel::Fist);
    }

    #[test]
    fn left_wins_over_call_when_both_hold() {
        let t = ClassifierThresholds {
            call_pinky_thumb_min: 0.0,
            call_pinky_ring_mcp_min: 0.0,
            ..ClassifierThresholds::default()
        };
        let hand = thumb_left();
        assert_eq!(matching_labels(&hand, &t), vec![GestureLabel::Left, GestureLabel::Call]);
        assert_eq!(classify(Some(&hand), &t), GestureLabel::Left);
    }

    #[test]
    fn up_wins_over_fist_when_both_hold() {
        // thumb tip tucked next to the ring knuckle while the chain still points up
        let hand = HandBuilder::new()
            .at(L::Wrist, 0.50, 0.90)
            .at(L::ThumbMcp, 0.50, 0.50)
            .at(L::ThumbIp, 0.50, 0.45)
            .at(L::ThumbTip, 0.50, 0.40)
            .at(L::IndexMcp, 0.50, 0.52)
            .at(L::MiddleMcp, 0.50, 0.30)
            .at(L::RingMcp, 0.50, 0.54)
            .at(L::PinkyMcp, 0.50, 0.55)
            .at(L::IndexTip, 0.45, 0.60)
            .at(L::MiddleTip, 0.45, 0.61)
            .at(L::RingTip, 0.45, 0.62)
            .at(L::PinkyPip, 0.55, 0.58)
            .at(L::PinkyTip, 0.45, 0.63)
            .build();
        let t = ClassifierThresholds::default();
        assert_eq!(matching_labels(&hand, &t)[..2], [GestureLabel::Up, GestureLabel::Fist]);
        assert_eq!(classify(Some(&hand), &t), GestureLabel::Up);
    }

    #[test]
    fn down_wins_over_fist_when_both_hold() {
        // thumb hanging down, fingertips folded under the knuckles
        let hand = HandBuilder::new()
            .at(L::Wrist, 0.50, 0.20)
            .at(L::ThumbCmc, 0.45, 0.30)
            .at(L::ThumbMcp, 0.42, 0.45)
            .at(L::ThumbIp, 0.41, 0.55)
            .at(L::ThumbTip, 0.40, 0.65)
            .at(L::PinkyMcp, 0.50, 0.27)
            .at(L::RingMcp, 0.50, 0.32)
            .at(L::MiddleMcp, 0.50, 0.37)
            .at(L::IndexMcp, 0.50, 0.42)
            .at(L::IndexTip, 0.47, 0.50)
            .at(L::MiddleTip, 0.47, 0.48)
            .at(L::RingTip, 0.47, 0.46)
            .at(L::PinkyTip, 0.47, 0.44)
            .build();
        let t = ClassifierThresholds {
            fist_thumb_ring_mcp_max: 0.4,
            ..ClassifierThresholds::default()
        };
        assert_eq!(matching_labels(&hand, &t), vec![GestureLabel::Down, GestureLabel::Fist]);
        assert_eq!(classify(Some(&hand), &t), GestureLabel::Down);
    }

    #[test]
    fn fist_wins_over_two_when_both_hold() {
        let t = ClassifierThresholds {
            two_index_middle_max: 0.2,
            ..ClassifierThresholds::default()
        };
        let hand = fist();
        assert_eq!(matching_labels(&hand, &t), vec![GestureLabel::Fist, GestureLabel::Two]);
        assert_eq!(classify(Some(&hand), &t), GestureLabel::Fist);
    }

    #[test]
    fn right_wins_over_call_when_both_hold() {
        let t = ClassifierThresholds {
            call_pinky_thumb_min: 0.0,
            call_pinky_ring_mcp_min: 0.0,
            ..ClassifierThresholds::default()
        };
        let hand = thumb_right();
        assert_eq!(matching_labels(&hand, &t), vec![GestureLabel::Right, GestureLabel::Call]);
        assert_eq!(classify(Some(&hand), &t), GestureLabel::Right);
    }

    #[test]
    fn call_wins_over_two_when_both_hold() {
        // call sign with the pinky dropped below the ring knuckle
        let hand = HandBuilder::new()
            .at(L::Wrist, 0.50, 0.80)
            .at(L::ThumbCmc, 0.36, 0.76)
            .at(L::ThumbMcp, 0.38, 0.70)
            .at(L::ThumbIp, 0.33, 0.66)
            .at(L::ThumbTip, 0.28, 0.62)
            .at(L::IndexMcp, 0.45, 0.60)
            .at(L::MiddleMcp, 0.50, 0.59)
            .at(L::RingMcp, 0.55, 0.60)
            .at(L::PinkyMcp, 0.60, 0.62)
            .at(L::IndexTip, 0.45, 0.66)
            .at(L::MiddleTip, 0.50, 0.66)
            .at(L::RingTip, 0.55, 0.67)
            .at(L::PinkyPip, 0.66, 0.68)
            .at(L::PinkyTip, 0.72, 0.75)
            .build();
        let t = ClassifierThresholds {
            two_thumb_ring_max: 0.3,
            ..ClassifierThresholds::default()
        };
        assert_eq!(matching_labels(&hand, &t), vec![GestureLabel::Call, GestureLabel::Two]);
        assert_eq!(classify(Some(&hand), &t), GestureLabel::Call);
    }

    #[test]
    fn ok_and_two_cannot_both_hold() {
        // ok needs the pinky tip above every knuckle, two needs it below the ring knuckle
        let t = ClassifierThresholds {
            ok_pinch_max: 1.0,
            two_index_middle_max: 1.0,
            two_thumb_ring_max: 1.0,
            ..ClassifierThresholds::default()
        };
        for hand in [ok_sign(), two_fingers()] {
            let matches = matching_labels(&hand, &t);
            assert!(
                !(matches.contains(&GestureLabel::Ok) && matches.contains(&GestureLabel::Two)),
                "{:?}",
                matches
            );
        }
    }

    #[test]
    fn every_threshold_changes_the_outcome() {
        type Tweak = fn(&mut ClassifierThresholds);
        let cases: [(HandObservation, GestureLabel, Tweak); 7] = [
            (fist(), GestureLabel::Fist, |t| t.fist_thumb_ring_mcp_max = 0.01),
            (ok_sign(), GestureLabel::Ok, |t| t.ok_pinch_max = 0.001),
            (thumb_left(), GestureLabel::Left, |t| t.left_thumb_index_mcp_min = 0.5),
            (call_sign(), GestureLabel::Call, |t| t.call_pinky_thumb_min = 1.0),
            (call_sign(), GestureLabel::Call, |t| t.call_pinky_ring_mcp_min = 1.0),
            (two_fingers(), GestureLabel::Two, |t| t.two_index_middle_max = 0.001),
            (two_fingers(), GestureLabel::Two, |t| t.two_thumb_ring_max = 0.001),
        ];
        for (hand, expected, tweak) in cases {
            let mut t = ClassifierThresholds::default();
            assert_eq!(classify(Some(&hand), &t), expected);
            tweak(&mut t);
            assert_ne!(classify(Some(&hand), &t), expected, "{:?}", t);
        }
    }

    #[test]
    fn pointing_gate_requires_raised_index_on_right_hand() {
        assert!(pointing_gate(&pointing()));
        assert!(!pointing_gate(&thumbs_up()));

        let mut left = pointing();
        left.handedness = Handedness::Left;
        assert!(!pointing_gate(&left));
    }

    #[test]
    fn left_handed_builder_still_classifies() {
        let hand = HandBuilder::new()
            .at(L::Wrist, 0.50, 0.80)
            .left_handed()
            .build();
        assert_eq!(hand.handedness, Handedness::Left);
        assert_eq!(label(&hand), GestureLabel::None);
    }
}
