use std::collections::HashMap;

/// Quadratic reward for in-order, near-adjacent runs of the query
/// tokens. From each occurrence of the first token, greedily chain a
/// position of each following token at distance 1..=2; a matched run
/// of length L contributes L*(L-1)/2. Runs from every starting
/// occurrence are summed.
pub fn phrase_bonus(query_tokens: &[String], token_positions: &HashMap<String, Vec<u32>>) -> u64 {
    let Some(first_token) = query_tokens.first() else {
        return 0;
    };
    let Some(starts) = token_positions.get(first_token) else {
        return 0;
    };

    let mut bonus = 0u64;
    for &start in starts {
        let mut curr = start;
        let mut length = 1u64;

        for token in &query_tokens[1..] {
            let next = token_positions
                .get(token)
                .and_then(|ps| ps.iter().find(|&&p| p > curr && p - curr <= 2));
            match next {
                Some(&p) => {
                    curr = p;
                    length += 1;
                }
                None => break,
            }
        }

        bonus += length * (length - 1) / 2;
    }

    bonus
}
