/*!

# Representing tier precedence in the ranking merge

- Status: accepted
- Date: 2026-06-18

Tracking issue: N/A

## Context and Problem Statement

Offers are gathered in four tiers of decreasing specificity, and a more
specific tier must always outrank a less specific one. Within a tier, offers
carry an `ordem` key assigned by campaign operators. How should the merge
express the precedence between tiers?

## Decision Drivers

- `ordem` keys are operator-entered data with no enforced upper bound.
- The precedence rule is absolute. No key value should be able to move an
  offer ahead of a more specific tier.
- The merge must stay easy to verify against the responses of the previous
  generation of the service.

## Considered Options

1. Band the keys: add a fixed offset per tier (0, +100, +200, +300) and sort
   everything in one list.
2. Sort each tier by its own keys and concatenate the tiers in precedence
   order.

## Decision Outcome

Chosen option: option 2, concatenation, because it makes precedence
structural instead of arithmetic.

The previous generation of the service used option 1. Its banding silently
breaks as soon as a tier holds a key of 100 or more: the offender sorts into
the next band, below offers it should have outranked. Option 2 cannot
misbehave that way, and for all inputs where the bands happen to hold, the
two options produce identical output.

### Positive Consequences

- Operators can use any key values they like, including sparse ones such as
  10, 20, 30 or timestamps.
- The merge is a stable per-tier sort followed by an append, which is easy to
  reason about and to test tier by tier.

### Negative Consequences

- There is no single combined sort key to inspect when debugging a ranking.
  The tier an offer came from has to be logged separately, which the ranker
  does at debug level.
*/
