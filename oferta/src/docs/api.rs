/*!
# Oferta API documentation

This page describes the API endpoints available on Oferta.

## Offer ranking

Endpoint: `/api/oferta`

Example: `/api/oferta?campanha=natal&celular=11988887777&local_id=42`

The primary endpoint of the service. Given a campaign, a customer and a site,
it answers the ordered list of offers that should be shown to that customer,
most relevant first.

This endpoint accepts both GET and POST requests. Parameters can be sent as
query string values, as a JSON request body, or as a mix of the two. When a
parameter appears in both places, the query string value wins and the body
fills in the parameters the query string doesn't mention. A body that is
missing, not JSON, or the wrong shape is ignored.

### Parameters

- `campanha` - The campaign identifier. Required. An empty value counts as
  missing.

- `celular` - The customer's phone number. Required. Every non-digit character
  is stripped before use, so `(11) 98888-7777` and `11988887777` name the same
  customer. A value with no digits at all counts as missing.

- `local_id` - The site identifier. Required. Must be a whole number; it may
  be sent as a string or, in JSON bodies, as a number.

- `genero` - The customer's gender. Optional. The value is matched verbatim
  against the profile table, so an *empty* `genero` is a value in its own
  right, distinct from not sending the parameter at all.

- `nascimento` - The customer's birth date, in `1990-12-31` format. Optional.
  The date is only used to place the customer in an age bracket. Empty values
  and the `0000-00-00` placeholder count as not sent. A value in any other
  format is logged and ignored; it never fails the request.

### Response

A successful request returns a JSON array of offers, ordered from most to
least relevant. `ordem` always counts 1, 2, 3, ... without gaps, and each
offer appears at most once.

```json
[
    { "ordem": 1, "oferta": "OF-1001" },
    { "ordem": 2, "oferta": "OF-2002" }
]
```

A customer with no offers at all gets `200 OK` with an empty array, not an
error.

### Errors

Error responses are a JSON object with a single `error` key. The messages are
part of the wire contract; clients parse them.

- `400` with `Parâmetros 'campanha', 'celular' e 'local_id' são obrigatórios.`
  when a required parameter is missing or empty.
- `400` with `O parâmetro 'local_id' deve ser um número válido.` when
  `local_id` is present but not a whole number.
- `500` with `Erro ao executar a consulta: ...` when the candidate source
  fails while answering the lookups.
- `500` with `Erro ao inicializar o cliente do ClickHouse.` when the candidate
  source cannot be set up from the current configuration.

### Ranking

Offers are gathered in four tiers, from most to least specific: offers
assigned directly to the customer, offers assigned to a segment the customer
belongs to, offers assigned to the customer's demographic profile, and the
site-wide defaults. A more specific tier always outranks a less specific one,
and within a tier offers follow the order assigned by the campaign operators.
An offer that appears in several tiers is kept only in the most specific one.

## Operational endpoints

The service hosts the endpoints needed to operate it behind our deployment
environment's conventions:

- `/__heartbeat__` - Reports on the health of the server.
- `/__lbheartbeat__` - Answers 200 whenever the server is running, for load
  balancers.
- `/__version__` - The version information the server was built from.
- `/__error__` - Deliberately produces an internal error, to test error
  reporting.

## Debug endpoints

- `/debug/settings` - The settings the server is running with, with secrets
  masked. Only enabled when the `debug` setting is on; otherwise it answers
  404.
*/
